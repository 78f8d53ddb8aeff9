// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Defaults filled in when a caller leaves out an externalId or password.
//! None of these are secrets, so the thread-local RNG is good enough.

use rand::Rng;
use rand::distributions::Alphanumeric;

const EXTERNAL_ID_LEN: usize = 12;

const ADJECTIVES: [&str; 40] = [
    "Quick", "Happy", "Bright", "Smart", "Cool", "Fast", "Safe", "Good",
    "Blue", "Green", "Red", "Gold", "Silver", "Purple", "Orange", "Pink",
    "Bold", "Calm", "Warm", "Fresh", "Clean", "Sweet", "Sharp", "Smooth",
    "Strong", "Light", "Dark", "Soft", "Hard", "Tall", "Short", "Wide",
    "Deep", "High", "Low", "Rich", "Pure", "Fine", "Rare", "New",
];

const NOUNS: [&str; 40] = [
    "Cat", "Dog", "Bird", "Fish", "Star", "Moon", "Sun", "Tree", "Lion",
    "Tiger", "Bear", "Wolf", "Fox", "Hawk", "Eagle", "Dove", "Rose", "Lily",
    "Oak", "Pine", "River", "Lake", "Hill", "Rock", "Fire", "Wind", "Rain",
    "Snow", "Cloud", "Storm", "Wave", "Ocean", "House", "Tower", "Bridge",
    "Castle", "Garden", "Forest", "Valley", "Mountain",
];

/// 12 characters drawn uniformly from `[A-Za-z0-9]`.
pub fn generate_external_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(EXTERNAL_ID_LEN)
        .map(char::from)
        .collect()
}

/// An easy to read password of the form `<Adjective><Noun><6 digits>!`,
/// e.g. `BrightOwl123456!`.
pub fn generate_password() -> String {
    let mut rng = rand::thread_rng();

    let adjective = ADJECTIVES[rng.gen_range(0..ADJECTIVES.len())];
    let noun = NOUNS[rng.gen_range(0..NOUNS.len())];
    let number: u32 = rng.gen_range(100_000..=999_999);

    format!("{adjective}{noun}{number}!")
}

/// An 8 digit number with no leading zero, as a string.
pub fn generate_group_external_id() -> String {
    rand::thread_rng().gen_range(10_000_000u32..=99_999_999).to_string()
}
