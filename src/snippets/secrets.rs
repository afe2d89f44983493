use std::fmt::Write;

use rand::seq::IndexedRandom;

pub const MODIFICATION_CODE_LEN: usize = 12;

const ADJECTIVES: [&str; 25] = [
    "Quick", "Lazy", "Mysterious", "Jolly", "Brave", "Silent", "Witty", "Fierce",
    "Clever", "Gentle", "Wild", "Calm", "Bold", "Shy", "Proud", "Happy", "Sleepy",
    "Eager", "Fancy", "Rusty", "Golden", "Silver", "Bright", "Curious", "Lucky",
];

const NOUNS: [&str; 24] = [
    "Fox", "Bear", "Eagle", "Wolf", "Dragon", "Tiger", "Lion", "Owl", "Rabbit",
    "Falcon", "Hawk", "Shark", "Panda", "Kitten", "Otter", "Phoenix", "Griffin",
    "Badger", "Turtle", "Dolphin", "Whale", "Heron", "Lynx", "Crab",
];

/// Cosmetic display name like `BraveOtter`. Not unique.
pub fn username() -> String {
    let mut rng = rand::rng();
    let adjective = ADJECTIVES.choose(&mut rng).copied().unwrap_or("Curious");
    let noun = NOUNS.choose(&mut rng).copied().unwrap_or("Crab");
    format!("{adjective}{noun}")
}

/// 12 lowercase hex characters from the thread-local CSPRNG.
pub fn modification_code() -> String {
    let bytes: [u8; MODIFICATION_CODE_LEN / 2] = rand::random();
    bytes.iter().fold(String::with_capacity(MODIFICATION_CODE_LEN), |mut out, b| {
        let _ = write!(out, "{b:02x}");
        out
    })
}

pub fn is_well_formed(code: &str) -> bool {
    code.len() == MODIFICATION_CODE_LEN && code.bytes().all(|b| b.is_ascii_alphanumeric())
}
