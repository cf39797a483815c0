//! The code table shared in structure by encoder and decoder.
use crate::{Code, Configuration, LzwError, LITERALS};

/// Maps codes to strings and, for encoding, strings to codes.
///
/// Codes below `256` are the literal bytes. Dynamic entries are appended in order starting
/// from the first code of the configuration, each is the string of a prefix code extended by
/// one byte.
pub(crate) struct Dictionary {
    config: Configuration,
    /// The next code to be assigned.
    next_code: u32,
    /// One link per dynamic entry.
    links: Vec<Link>,
    /// Successors of each code, for prefix matching.
    tree: Tree,
    /// If the tree is maintained, only encoders search for strings.
    successors: bool,
}

#[derive(Clone, Copy)]
struct Link {
    prefix: Code,
    byte: u8,
    /// The first byte of the whole string.
    first: u8,
    /// The length of the whole string.
    depth: u32,
}

/// One tree node for at most each code.
/// To avoid using too much memory we keep nodes with few successors in optimized form. This form
/// doesn't offer lookup by indexing but instead does a linear search.
#[derive(Default)]
struct Tree {
    simples: Vec<Simple>,
    complex: Vec<Full>,
    keys: Vec<FullKey>,
}

#[derive(Clone, Copy)]
enum FullKey {
    NoSuccessor,
    Simple(u16),
    Full(u16),
}

const SHORT: usize = 16;

/// Dynamic codes are never below `256`, so zero marks a missing successor.
const NO_CODE: Code = 0;

#[derive(Clone, Copy)]
struct Simple {
    codes: [Code; SHORT],
    chars: [u8; SHORT],
    count: u8,
}

#[derive(Clone, Copy)]
struct Full {
    char_continuation: [Code; 256],
}

impl Dictionary {
    /// A table for decoding, without string search.
    pub(crate) fn new(config: Configuration) -> Self {
        let capacity = (config.code_space() - u32::from(config.first_code())) as usize;
        Dictionary {
            config,
            next_code: u32::from(config.first_code()),
            links: Vec::with_capacity(capacity),
            tree: Tree::default(),
            successors: false,
        }
    }

    /// A table that also finds the code of a prefix extended by one byte.
    pub(crate) fn with_successors(config: Configuration) -> Self {
        let mut dict = Dictionary::new(config);
        dict.successors = true;
        dict.tree.init(config.first_code());
        dict
    }

    /// Drop all dynamic entries.
    pub(crate) fn reset(&mut self) {
        self.next_code = u32::from(self.config.first_code());
        self.links.clear();
        if self.successors {
            self.tree.reset(self.config.first_code());
        }
    }

    pub(crate) fn next_code(&self) -> u32 {
        self.next_code
    }

    /// The width of the next code word read or written.
    pub(crate) fn width(&self) -> u8 {
        self.config.width_for(self.next_code)
    }

    /// If no further code can be represented at the maximum width.
    pub(crate) fn is_full(&self) -> bool {
        self.next_code >= self.config.code_space()
    }

    pub(crate) fn is_assigned(&self, code: Code) -> bool {
        let code = u32::from(code);
        code < LITERALS || (code >= u32::from(self.config.first_code()) && code < self.next_code)
    }

    /// Append the string of `code` to `into`.
    pub(crate) fn lookup(&self, code: Code, into: &mut Vec<u8>) -> Result<(), LzwError> {
        if !self.is_assigned(code) {
            return Err(self.unassigned(code));
        }

        if u32::from(code) < LITERALS {
            into.push(code as u8);
            return Ok(());
        }

        let depth = self.link(code).depth as usize;
        let start = into.len();
        into.resize(start + depth, 0);

        let mut code_iter = code;
        for ch in into[start..].iter_mut().rev() {
            if u32::from(code_iter) < LITERALS {
                *ch = code_iter as u8;
            } else {
                let link = self.link(code_iter);
                *ch = link.byte;
                code_iter = link.prefix;
            }
        }

        Ok(())
    }

    /// The first byte of the string of an assigned code.
    pub(crate) fn first_byte(&self, code: Code) -> u8 {
        if u32::from(code) < LITERALS {
            code as u8
        } else {
            self.link(code).first
        }
    }

    /// Assign the next code to the string of `prefix` followed by `byte`.
    ///
    /// Returns `None` when the dictionary is full.
    pub(crate) fn append(&mut self, prefix: Code, byte: u8) -> Option<Code> {
        if self.is_full() {
            return None;
        }

        let code = self.next_code as Code;
        let (first, depth) = if u32::from(prefix) < LITERALS {
            (prefix as u8, 2)
        } else {
            let link = self.link(prefix);
            (link.first, link.depth + 1)
        };

        self.links.push(Link {
            prefix,
            byte,
            first,
            depth,
        });
        if self.successors {
            self.tree.append(prefix, byte, code);
        }
        self.next_code += 1;
        Some(code)
    }

    /// The code of the string of `prefix` followed by `byte`, if it was assigned.
    pub(crate) fn find(&self, prefix: Code, byte: u8) -> Option<Code> {
        self.tree.at_key(prefix, byte)
    }

    fn link(&self, code: Code) -> &Link {
        &self.links[usize::from(code - self.config.first_code())]
    }

    fn unassigned(&self, code: Code) -> LzwError {
        if u32::from(code) < u32::from(self.config.first_code()) {
            LzwError::UnknownCode(code)
        } else {
            LzwError::DictionaryDesync {
                code,
                next: self.next_code,
            }
        }
    }
}

impl Tree {
    fn init(&mut self, first_code: Code) {
        self.keys.resize(usize::from(first_code), FullKey::NoSuccessor);
    }

    fn reset(&mut self, first_code: Code) {
        self.simples.clear();
        self.complex.clear();
        self.keys.truncate(usize::from(first_code));
        for k in self.keys.iter_mut() {
            *k = FullKey::NoSuccessor;
        }
    }

    fn at_key(&self, code: Code, ch: u8) -> Option<Code> {
        let key = *self.keys.get(usize::from(code))?;
        match key {
            FullKey::NoSuccessor => None,
            FullKey::Simple(idx) => {
                let nexts = &self.simples[usize::from(idx)];
                let successors = nexts
                    .codes
                    .iter()
                    .zip(nexts.chars.iter())
                    .take(usize::from(nexts.count));
                for (&scode, &sch) in successors {
                    if sch == ch {
                        return Some(scode);
                    }
                }

                None
            }
            FullKey::Full(idx) => {
                let full = &self.complex[usize::from(idx)];
                let precode = full.char_continuation[usize::from(ch)];
                Some(precode).filter(|&code| code != NO_CODE)
            }
        }
    }

    fn append(&mut self, code: Code, ch: u8, next: Code) {
        let key = self.keys[usize::from(code)];
        match key {
            FullKey::NoSuccessor => {
                let new_key = FullKey::Simple(self.simples.len() as u16);
                let mut simple = Simple::default();
                simple.codes[0] = next;
                simple.chars[0] = ch;
                simple.count = 1;
                self.simples.push(simple);
                self.keys[usize::from(code)] = new_key;
            }
            FullKey::Simple(idx) if usize::from(self.simples[usize::from(idx)].count) < SHORT => {
                let nexts = &mut self.simples[usize::from(idx)];
                let nidx = usize::from(nexts.count);
                nexts.chars[nidx] = ch;
                nexts.codes[nidx] = next;
                nexts.count += 1;
            }
            FullKey::Simple(idx) => {
                let new_key = FullKey::Full(self.complex.len() as u16);
                let simples = &self.simples[usize::from(idx)];
                let mut full = Full {
                    char_continuation: [NO_CODE; 256],
                };
                for (&pch, &pcont) in simples.chars.iter().zip(simples.codes.iter()) {
                    full.char_continuation[usize::from(pch)] = pcont;
                }
                full.char_continuation[usize::from(ch)] = next;
                self.complex.push(full);
                self.keys[usize::from(code)] = new_key;
            }
            FullKey::Full(idx) => {
                let full = &mut self.complex[usize::from(idx)];
                full.char_continuation[usize::from(ch)] = next;
            }
        }
        // The new code has no successors yet.
        debug_assert_eq!(self.keys.len(), usize::from(next));
        self.keys.push(FullKey::NoSuccessor);
    }
}

impl Default for Simple {
    fn default() -> Self {
        Simple {
            codes: [0; SHORT],
            chars: [0; SHORT],
            count: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Dictionary;
    use crate::{Configuration, Flags, LzwError};

    fn dictionary(initial: u8, max: u8) -> Dictionary {
        let config = Configuration::new(initial, max, 0x101, 0x100, 0, Flags::EOF_CODE_VALID).unwrap();
        Dictionary::with_successors(config)
    }

    fn string_of(dict: &Dictionary, code: u16) -> Vec<u8> {
        let mut out = vec![];
        dict.lookup(code, &mut out).unwrap();
        out
    }

    #[test]
    fn literals_are_preassigned() {
        let dict = dictionary(9, 12);
        assert_eq!(string_of(&dict, 0), [0]);
        assert_eq!(string_of(&dict, u16::from(b'x')), b"x");
        assert_eq!(dict.next_code(), 0x101);
        assert_eq!(dict.width(), 9);
    }

    #[test]
    fn entries_chain_through_prefixes() {
        let mut dict = dictionary(9, 12);
        assert_eq!(dict.append(u16::from(b'e'), b'l'), Some(0x101));
        assert_eq!(dict.append(0x101, b'l'), Some(0x102));
        assert_eq!(dict.append(0x102, b'o'), Some(0x103));
        assert_eq!(string_of(&dict, 0x103), b"ello");
        assert_eq!(dict.first_byte(0x103), b'e');
        assert_eq!(dict.find(0x101, b'l'), Some(0x102));
        assert_eq!(dict.find(0x101, b'x'), None);
        assert_eq!(dict.find(u16::from(b'e'), b'l'), Some(0x101));
    }

    #[test]
    fn decoding_table_skips_successors() {
        let config = Configuration::new(9, 12, 0x101, 0x100, 0, Flags::EOF_CODE_VALID).unwrap();
        let mut dict = Dictionary::new(config);
        for ch in 0..=255u8 {
            dict.append(u16::from(b'a'), ch);
        }
        assert_eq!(string_of(&dict, 0x101 + 0x7a), b"az");
        assert_eq!(dict.find(u16::from(b'a'), b'z'), None);
        assert!(dict.tree.keys.is_empty());
        assert!(dict.tree.simples.is_empty() && dict.tree.complex.is_empty());
    }

    #[test]
    fn many_successors_of_one_prefix() {
        let mut dict = dictionary(9, 12);
        for ch in 0..=255u8 {
            assert_eq!(dict.append(u16::from(b'a'), ch), Some(0x101 + u16::from(ch)));
        }
        for ch in 0..=255u8 {
            assert_eq!(dict.find(u16::from(b'a'), ch), Some(0x101 + u16::from(ch)));
        }
        assert_eq!(string_of(&dict, 0x101 + 0x7a), b"az");
    }

    #[test]
    fn unassigned_codes_are_rejected() {
        let mut dict = dictionary(9, 12);
        let mut out = vec![];
        assert_eq!(dict.lookup(0x100, &mut out), Err(LzwError::UnknownCode(0x100)));
        assert_eq!(
            dict.lookup(0x101, &mut out),
            Err(LzwError::DictionaryDesync { code: 0x101, next: 0x101 })
        );
        dict.append(u16::from(b'a'), b'b');
        assert!(dict.lookup(0x101, &mut out).is_ok());
        assert_eq!(out, b"ab");
    }

    #[test]
    fn width_follows_entry_count() {
        let mut dict = dictionary(9, 10);
        for _ in 0x101..0x1ff {
            dict.append(u16::from(b'a'), b'a');
        }
        assert_eq!(dict.next_code(), 0x1ff);
        assert_eq!(dict.width(), 9);
        dict.append(u16::from(b'a'), b'b');
        assert_eq!(dict.width(), 10);
    }

    #[test]
    fn full_dictionary_refuses_entries() {
        let mut dict = dictionary(9, 9);
        for _ in 0x101..0x200 {
            assert!(dict.append(u16::from(b'a'), b'a').is_some());
        }
        assert!(dict.is_full());
        assert_eq!(dict.append(u16::from(b'a'), b'a'), None);
        assert_eq!(dict.width(), 9);

        dict.reset();
        assert!(!dict.is_full());
        assert_eq!(dict.next_code(), 0x101);
        assert_eq!(dict.find(u16::from(b'a'), b'a'), None);
        assert_eq!(dict.append(u16::from(b'a'), b'a'), Some(0x101));
    }
}
