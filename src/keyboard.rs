use rand::{Rng, RngCore};

/// Non-printing keys the keystroke transport must be able to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialKey {
    Backspace,
    Tab,
}

/// Whether `c` can be emitted through the keystroke transport.
///
/// ASCII graphic characters, space, and newline are supported. Tabs inside
/// clip text are not: the tab key is reserved for navigation.
pub fn is_supported_char(c: char) -> bool {
    c == '\n' || c == ' ' || c.is_ascii_graphic()
}

pub fn find_first_unsupported_char(text: &str) -> Option<(usize, char)> {
    text.char_indices().find(|&(_idx, c)| !is_supported_char(c))
}

/// A uniformly random lowercase letter, the crudest possible mistype.
pub fn random_lowercase(rng: &mut dyn RngCore) -> char {
    (b'a' + rng.gen_range(0..26u8)) as char
}

/// A character adjacent to `c` on a US-QWERTY layout, case preserved.
///
/// Returns `None` when `c` has no mapped neighbors (punctuation, space),
/// in which case callers fall back to [`random_lowercase`].
pub fn qwerty_adjacent_char(c: char, rng: &mut dyn RngCore) -> Option<char> {
    let (base, make_upper) = if c.is_ascii_uppercase() {
        (c.to_ascii_lowercase(), true)
    } else {
        (c, false)
    };

    let neighbors: &[char] = match base {
        'a' => &['q', 'w', 's', 'z', 'x'],
        'b' => &['v', 'g', 'h', 'n'],
        'c' => &['x', 'd', 'f', 'v'],
        'd' => &['s', 'e', 'r', 'f', 'c', 'x'],
        'e' => &['w', 's', 'd', 'r'],
        'f' => &['d', 'r', 't', 'g', 'v', 'c'],
        'g' => &['f', 't', 'y', 'h', 'b', 'v'],
        'h' => &['g', 'y', 'u', 'j', 'n', 'b'],
        'i' => &['u', 'j', 'k', 'o'],
        'j' => &['h', 'u', 'i', 'k', 'm', 'n'],
        'k' => &['j', 'i', 'o', 'l', ',', 'm'],
        'l' => &['k', 'o', 'p', ';', '.'],
        'm' => &['n', 'j', 'k', ','],
        'n' => &['b', 'h', 'j', 'm'],
        'o' => &['i', 'k', 'l', 'p'],
        'p' => &['o', 'l', '['],
        'q' => &['w', 'a'],
        'r' => &['e', 'd', 'f', 't'],
        's' => &['a', 'w', 'e', 'd', 'x', 'z'],
        't' => &['r', 'f', 'g', 'y'],
        'u' => &['y', 'h', 'j', 'i'],
        'v' => &['c', 'f', 'g', 'b'],
        'w' => &['q', 'a', 's', 'e'],
        'x' => &['z', 's', 'd', 'c'],
        'y' => &['t', 'g', 'h', 'u'],
        'z' => &['a', 's', 'x'],
        '1' => &['2', 'q'],
        '2' => &['1', '3', 'q', 'w'],
        '3' => &['2', '4', 'w', 'e'],
        '4' => &['3', '5', 'e', 'r'],
        '5' => &['4', '6', 'r', 't'],
        '6' => &['5', '7', 't', 'y'],
        '7' => &['6', '8', 'y', 'u'],
        '8' => &['7', '9', 'u', 'i'],
        '9' => &['8', '0', 'i', 'o'],
        '0' => &['9', 'o', 'p'],
        _ => return None,
    };

    let chosen = neighbors[rng.gen_range(0..neighbors.len())];
    Some(if make_upper {
        chosen.to_ascii_uppercase()
    } else {
        chosen
    })
}
