//! User-visible replies for contact handling.
//!
//! Classification tags never reach the user; these are the sentences they map to.

pub const EMAIL_RECEIVED: &str =
    "Thanks for your email! We've received your details and will contact you shortly. Looking forward to working with you!";

pub const PHONE_RECEIVED: &str =
    "Thanks for your number! We've received your details and will contact you shortly. Looking forward to working with you!";

pub const EMAIL_CORRECTION: &str = "That doesn't seem to be a valid email format. Please double-check and provide your full email address (e.g., yourname@gmail.com).";

pub const EMAIL_GIVE_UP: &str =
    "That's still not a valid email, but no worries if you don't have one handy!";

pub const PHONE_CORRECTION: &str =
    "That phone number doesn't seem complete. Please provide a full phone number.";

pub const PHONE_GIVE_UP: &str =
    "That still doesn't look like a full phone number, but no worries. We can keep chatting here!";

pub const CONFIRMATION_DECLINED: &str =
    "No problem! Feel free to share the best way to reach you whenever you like.";

pub const RESET_DONE: &str = "Chat cleared. How can I help you today?";

pub fn confirm_email(address: &str) -> String {
    format!("Just to confirm, is {address} the best email to reach you at?")
}

pub fn confirm_phone(number: &str) -> String {
    format!("Just to check, is {number} a phone number we can reach you on?")
}

/// A yes/no answer to a confirmation question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Yes,
    No,
}

const AFFIRMATIVE: &[&str] = &[
    "yes",
    "yep",
    "yeah",
    "yup",
    "y",
    "sure",
    "correct",
    "right",
    "that's right",
    "that is right",
    "that's correct",
    "confirmed",
    "absolutely",
];

const NEGATIVE: &[&str] = &["no", "nope", "nah", "n", "wrong", "incorrect", "not really"];

/// Read a short message as a yes or no, if it is one.
///
/// Matches when the message is a listed word or starts with one followed by
/// a space or comma ("yes, that's it").
pub fn parse_confirmation(text: &str) -> Option<Confirmation> {
    let normalized = text
        .trim()
        .trim_end_matches(|c: char| c == '!' || c == '.' || c == '?')
        .to_lowercase();
    let matches = |word: &&str| {
        normalized == *word
            || normalized
                .strip_prefix(*word)
                .is_some_and(|rest| rest.starts_with(' ') || rest.starts_with(','))
    };
    if NEGATIVE.iter().any(matches) {
        Some(Confirmation::No)
    } else if AFFIRMATIVE.iter().any(matches) {
        Some(Confirmation::Yes)
    } else {
        None
    }
}
