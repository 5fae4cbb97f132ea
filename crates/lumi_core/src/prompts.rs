//! Journal prompt catalog.

use rand::seq::SliceRandom;
use rand::Rng;

/// Prompts offered above the journal input, grouped positive, neutral,
/// then reflective.
pub const PROMPTS: &[&str] = &[
    "Describe one specific moment today that made you smile - what exactly happened?",
    "Which person did you enjoy spending time with today and what did you do together?",
    "What was the most enjoyable activity you did today and why did it stand out?",
    "Tell me about one small interaction today that lifted your mood",
    "What was the best part of your morning/afternoon/evening today?",
    "Describe a moment of connection you had with someone today",
    "What made you laugh out loud today?",
    "What was the most satisfying task you completed today?",
    "Tell me about a moment today when you felt loved or cared for",
    "What unexpected good thing happened to you today?",
    "What did you spend most of your time doing today?",
    "Describe the first thing you remember from when you woke up",
    "What was the most interesting thing you noticed today?",
    "How did you spend your free time today?",
    "What conversations did you have today and what were they about?",
    "What was different about today compared to yesterday?",
    "What did you eat today and how did it make you feel?",
    "Describe the energy levels you had throughout the day",
    "What thoughts kept coming back to you today?",
    "How did you feel physically today - any aches, pains, or sensations?",
    "What decisions did you make today, big or small?",
    "Describe your workspace or environment today",
    "What did you learn about yourself today?",
    "How did you feel about the pace of your day?",
    "What was on your mind during quiet moments today?",
    "What was the hardest part of today and how did you handle it?",
    "Describe a moment today when you felt frustrated or upset",
    "What did you wish had gone differently today?",
    "Tell me about a time today when you felt misunderstood or alone",
    "What worried you the most today?",
    "Describe a situation today that left you feeling drained",
    "What made you feel anxious or stressed today?",
    "Tell me about something you avoided or put off today",
    "What disappointed you today?",
    "Describe a moment when you felt overwhelmed today",
    "What made you feel sad or heavy-hearted today?",
    "Tell me about a conflict or tension you experienced today",
    "What regret or \"should have\" thought crossed your mind today?",
    "Describe a moment today when you felt inadequate or not good enough",
    "What did you struggle with today that you wish was easier?",
    "Tell me about a time today when you felt disconnected from others",
    "What fear or insecurity came up for you today?",
    "Describe something you were too tired or unmotivated to do today",
    "What criticism or negative feedback affected you today?",
    "Tell me about a moment today when you felt stuck or uncertain",
    "What loss or ending are you processing today?",
    "Describe a time today when you felt like you weren't living up to expectations",
    "What part of today felt empty or meaningless?",
    "Tell me about something that triggered sadness or grief today",
    "What made you feel lonely today?",
];

/// Picks a random prompt different from `excluding` when possible.
pub fn random_prompt(excluding: Option<&str>) -> &'static str {
    random_prompt_with(&mut rand::thread_rng(), excluding)
}

pub fn random_prompt_with<R: Rng + ?Sized>(rng: &mut R, excluding: Option<&str>) -> &'static str {
    let candidates: Vec<&'static str> = PROMPTS
        .iter()
        .copied()
        .filter(|prompt| Some(*prompt) != excluding)
        .collect();
    candidates
        .choose(rng)
        .or_else(|| PROMPTS.first())
        .copied()
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn catalog_has_no_duplicates() {
        let unique: std::collections::HashSet<_> = PROMPTS.iter().collect();
        assert_eq!(unique.len(), PROMPTS.len());
    }

    #[test]
    fn never_repeats_the_excluded_prompt() {
        let mut rng = StdRng::seed_from_u64(7);
        let current = PROMPTS[0];
        for _ in 0..200 {
            assert_ne!(random_prompt_with(&mut rng, Some(current)), current);
        }
    }
}
