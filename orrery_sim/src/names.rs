// Procedural names for generated systems, bodies and groups.
//
// Star names are compounds of one or two syllable roots (~60% two roots),
// capitalized. Everything else derives from its host's name in the usual
// astronomical style: companions get `B`, `C`; planets get lowercase letters
// from `b`; moons get roman numerals; sub-moons get a numeric suffix. Minor
// bodies (asteroids, comets) are numbered per host.
//
// See also: `generator.rs`, which owns the `names` sub-stream for each
// system.
//
// **Critical constraint: determinism.** All randomness comes from the
// `SeededRng` passed by the caller.

use crate::prng::SeededRng;

const ROOTS: &[&str] = &[
    "al", "bel", "cor", "dra", "el", "fen", "gal", "hy", "ix", "jor", "kal", "lum", "mir", "nov",
    "or", "pra", "quel", "ran", "sol", "tor", "ul", "vex", "wyn", "xan", "yr", "zed", "aur",
    "cael", "dun", "esk", "thal", "vor",
];

const ENDINGS: &[&str] = &["a", "is", "on", "ar", "ei", "us", "ix", "en", ""];

const GROUP_WORDS: &[&str] = &[
    "Reach", "Expanse", "Cluster", "Drift", "Veil", "March", "Deep", "Crown", "Hollow", "Spur",
];

/// A fresh star (system) name.
pub fn star_name(rng: &mut SeededRng) -> String {
    let roots = if rng.bool(0.6) { 2 } else { 1 };
    let mut name = String::new();
    for _ in 0..roots {
        name.push_str(rng.choice(ROOTS).copied().unwrap_or("sol"));
    }
    name.push_str(rng.choice(ENDINGS).copied().unwrap_or(""));
    capitalize(&name)
}

/// A group name such as "Velmir Reach".
pub fn group_name(rng: &mut SeededRng) -> String {
    let word = rng.choice(GROUP_WORDS).copied().unwrap_or("Cluster");
    format!("{} {}", star_name(rng), word)
}

/// `index` 1 → "Sol B", 2 → "Sol C", ...
pub fn companion_name(primary: &str, index: usize) -> String {
    format!("{primary} {}", letter(index, 'A'))
}

/// `index` 0 → "Sol b", 1 → "Sol c", ...
pub fn planet_name(star: &str, index: usize) -> String {
    format!("{star} {}", letter(index + 1, 'a'))
}

/// `index` 0 → "Sol b I", 1 → "Sol b II", ...
pub fn moon_name(planet: &str, index: usize) -> String {
    format!("{planet} {}", roman(index + 1))
}

/// `index` 0 → "Sol b I-1", ...
pub fn sub_moon_name(moon: &str, index: usize) -> String {
    format!("{moon}-{}", index + 1)
}

/// `index` 0 → "Sol Comet 1", ...
pub fn minor_body_name(host: &str, category: &str, index: usize) -> String {
    format!("{host} {category} {}", index + 1)
}

/// A free-floating planet has no host to derive from.
pub fn rogue_name(rng: &mut SeededRng) -> String {
    format!("{} Wanderer", star_name(rng))
}

/// Letters past `z` fall back to a numeric suffix.
fn letter(offset: usize, base: char) -> String {
    match u8::try_from(offset) {
        Ok(o) if o < 26 => char::from(base as u8 + o).to_string(),
        _ => format!("{base}{offset}"),
    }
}

fn roman(mut n: usize) -> String {
    const TABLE: [(usize, &str); 13] = [
        (1000, "M"),
        (900, "CM"),
        (500, "D"),
        (400, "CD"),
        (100, "C"),
        (90, "XC"),
        (50, "L"),
        (40, "XL"),
        (10, "X"),
        (9, "IX"),
        (5, "V"),
        (4, "IV"),
        (1, "I"),
    ];
    let mut out = String::new();
    for &(value, numeral) in &TABLE {
        while n >= value {
            out.push_str(numeral);
            n -= value;
        }
    }
    out
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        None => String::new(),
        Some(c) => c.to_uppercase().chain(chars).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn star_names_are_capitalized_and_deterministic() {
        let mut a = SeededRng::new(5);
        let mut b = SeededRng::new(5);
        for _ in 0..100 {
            let name = star_name(&mut a);
            assert_eq!(name, star_name(&mut b));
            assert!(name.chars().next().is_some_and(char::is_uppercase), "{name}");
        }
    }

    #[test]
    fn derived_names() {
        assert_eq!(companion_name("Sol", 1), "Sol B");
        assert_eq!(planet_name("Sol", 0), "Sol b");
        assert_eq!(planet_name("Sol", 2), "Sol d");
        assert_eq!(moon_name("Sol b", 3), "Sol b IV");
        assert_eq!(sub_moon_name("Sol b IV", 0), "Sol b IV-1");
        assert_eq!(minor_body_name("Sol", "Comet", 1), "Sol Comet 2");
    }

    #[test]
    fn roman_numerals() {
        assert_eq!(roman(9), "IX");
        assert_eq!(roman(14), "XIV");
        assert_eq!(roman(49), "XLIX");
    }

    #[test]
    fn letters_overflow_to_numbers() {
        assert_eq!(letter(25, 'a'), "z");
        assert_eq!(letter(26, 'a'), "a26");
    }

    #[test]
    fn capitalize_handles_empty() {
        assert_eq!(capitalize(""), "");
        assert_eq!(capitalize("vex"), "Vex");
    }
}
