//! Password-generation policies and their compact hex encodings.
//!
//! A policy can live in four places: the application default, the named
//! list in the file header, a record that references a header policy by
//! name, or a record that carries its own inline field set.  The wire
//! form packs flags and length minimums into fixed-width hex fields:
//!
//! ```text
//! flags:4  length:3  minDigits:3  minLower:3  minSymbols:3  minUpper:3
//! ```
//!
//! Header policies prefix `{nameLen:2}{name}` and append
//! `{specialLen:2}{special}`; the header list starts with a 2-digit
//! policy count and must be consumed exactly to its end.

use rand::seq::SliceRandom;
use rand::{Rng, RngCore};

use crate::errors::{PsafeError, Result};
use crate::file::trigram::TrigramTable;

// ---------------------------------------------------------------------------
// Flags and character sets
// ---------------------------------------------------------------------------

pub const FLAG_USE_LOWERCASE: u16 = 0x8000;
pub const FLAG_USE_UPPERCASE: u16 = 0x4000;
pub const FLAG_USE_DIGITS: u16 = 0x2000;
pub const FLAG_USE_SYMBOLS: u16 = 0x1000;
pub const FLAG_USE_HEX_DIGITS: u16 = 0x0800;
pub const FLAG_USE_EASY_VISION: u16 = 0x0400;
pub const FLAG_MAKE_PRONOUNCEABLE: u16 = 0x0200;

/// Maximum value for length fields.
const LENGTH_MAX: u32 = 4095;

pub const SYMBOLS_DEFAULT: &str = "+-=_@#$%^&;:,.<>/~\\[](){}?!|";
pub const SYMBOLS_EASY: &str = "+-=_@#$%^&<>/~\\?";
pub const SYMBOLS_PRONOUNCE: &str = "@&(#!|$+";

pub const LOWER_CHARS: &str = "abcdefghijklmnopqrstuvwxyz";
pub const UPPER_CHARS: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
pub const DIGITS: &str = "0123456789";
pub const HEX_DIGITS: &str = "0123456789abcdef";
pub const EASY_LOWER_CHARS: &str = "abcdefghijkmnopqrstuvwxyz";
pub const EASY_UPPER_CHARS: &str = "ABCDEFGHJKLMNPQRTUVWXY";
pub const EASY_DIGITS: &str = "346789";

/// Where a policy is defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Location {
    /// The application-wide default policy.
    Default,
    /// Declared in the file header's named list.
    Header,
    /// A record referencing a header policy by name.
    RecordName,
    /// A record carrying its own inline field set.
    Record,
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Location::Default => write!(f, "default"),
            Location::Header => write!(f, "header"),
            Location::RecordName => write!(f, "named"),
            Location::Record => write!(f, "inline"),
        }
    }
}

/// How passwords are generated for a policy.  Derived from the flags;
/// easy-vision wins over pronounceable wins over hexadecimal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyType {
    Normal,
    EasyToRead,
    Pronounceable,
    Hexadecimal,
}

/// The three record fields a policy serializes into.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordPolicyStrs {
    pub policy_name: Option<String>,
    pub policy_str: Option<String>,
    pub own_symbols: Option<String>,
}

// ---------------------------------------------------------------------------
// PasswdPolicy
// ---------------------------------------------------------------------------

/// A password policy for a file or record.  Immutable once built; all
/// numeric fields are clamped to `0..=4095` on construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswdPolicy {
    name: String,
    location: Location,
    flags: u16,
    length: u32,
    min_lowercase: u32,
    min_uppercase: u32,
    min_digits: u32,
    min_symbols: u32,
    special_symbols: Option<String>,
}

impl PasswdPolicy {
    /// Standard policy: all four character classes, length 12, one of
    /// each class minimum.
    pub fn new(name: impl Into<String>, location: Location) -> Self {
        Self::with_fields(
            name,
            location,
            FLAG_USE_LOWERCASE | FLAG_USE_UPPERCASE | FLAG_USE_DIGITS | FLAG_USE_SYMBOLS,
            12,
            1,
            1,
            1,
            1,
            None,
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub fn with_fields(
        name: impl Into<String>,
        location: Location,
        flags: u16,
        length: u32,
        min_lower: u32,
        min_upper: u32,
        min_digits: u32,
        min_symbols: u32,
        special_symbols: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            location,
            flags,
            length: clamp_length(length),
            min_lowercase: clamp_length(min_lower),
            min_uppercase: clamp_length(min_upper),
            min_digits: clamp_length(min_digits),
            min_symbols: clamp_length(min_symbols),
            special_symbols,
        }
    }

    /// Copy of `other` under a different name.
    pub fn renamed(name: impl Into<String>, other: &PasswdPolicy) -> Self {
        Self {
            name: name.into(),
            ..other.clone()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn location(&self) -> Location {
        self.location
    }

    pub fn flags(&self) -> u16 {
        self.flags
    }

    /// True if every bit of `flags` is set.
    pub fn check_flags(&self, flags: u16) -> bool {
        (self.flags & flags) == flags
    }

    pub fn policy_type(&self) -> PolicyType {
        if self.check_flags(FLAG_USE_EASY_VISION) {
            PolicyType::EasyToRead
        } else if self.check_flags(FLAG_MAKE_PRONOUNCEABLE) {
            PolicyType::Pronounceable
        } else if self.check_flags(FLAG_USE_HEX_DIGITS) {
            PolicyType::Hexadecimal
        } else {
            PolicyType::Normal
        }
    }

    pub fn length(&self) -> u32 {
        self.length
    }

    pub fn min_lowercase(&self) -> u32 {
        self.min_lowercase
    }

    pub fn min_uppercase(&self) -> u32 {
        self.min_uppercase
    }

    pub fn min_digits(&self) -> u32 {
        self.min_digits
    }

    pub fn min_symbols(&self) -> u32 {
        self.min_symbols
    }

    pub fn special_symbols(&self) -> Option<&str> {
        self.special_symbols.as_deref()
    }

    // -----------------------------------------------------------------
    // Encoding
    // -----------------------------------------------------------------

    /// Encode as one entry of the header named-policy list.
    pub fn to_hdr_policy_string(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("{:02x}", self.name.chars().count()));
        out.push_str(&self.name);
        out.push_str(&self.flags_and_lengths_to_string());
        match &self.special_symbols {
            None => out.push_str("00"),
            Some(special) => {
                out.push_str(&format!("{:02x}", special.chars().count()));
                out.push_str(special);
            }
        }
        out
    }

    /// The fixed-width flags and lengths block shared by the header and
    /// record encodings.
    fn flags_and_lengths_to_string(&self) -> String {
        format!(
            "{:04x}{:03x}{:03x}{:03x}{:03x}{:03x}",
            self.flags,
            self.length,
            self.min_digits,
            self.min_lowercase,
            self.min_symbols,
            self.min_uppercase
        )
    }

    // -----------------------------------------------------------------
    // Generation
    // -----------------------------------------------------------------

    /// Generate a password satisfying this policy.
    ///
    /// Minimum counts for each enabled class are sampled first, the
    /// remaining slots are filled from the union of enabled classes, and
    /// the result is shuffled.  Length is a floor: if the minimums sum
    /// past it, the extra characters are kept.
    pub fn generate(&self, ctx: &mut PolicyContext<'_>) -> String {
        let mut passwd: Vec<char> = Vec::new();
        let mut allchars: Vec<char> = Vec::new();

        match self.policy_type() {
            PolicyType::Normal => {
                self.add_random_chars(
                    FLAG_USE_LOWERCASE,
                    self.min_lowercase,
                    LOWER_CHARS,
                    &mut passwd,
                    &mut allchars,
                    ctx,
                );
                self.add_random_chars(
                    FLAG_USE_UPPERCASE,
                    self.min_uppercase,
                    UPPER_CHARS,
                    &mut passwd,
                    &mut allchars,
                    ctx,
                );
                self.add_random_chars(
                    FLAG_USE_DIGITS,
                    self.min_digits,
                    DIGITS,
                    &mut passwd,
                    &mut allchars,
                    ctx,
                );
                let syms = match self.special_symbols.as_deref() {
                    Some(own) => own,
                    None => match ctx.default_symbols {
                        Some(prefs) if !prefs.is_empty() => prefs,
                        _ => SYMBOLS_DEFAULT,
                    },
                };
                self.add_random_chars(
                    FLAG_USE_SYMBOLS,
                    self.min_symbols,
                    syms,
                    &mut passwd,
                    &mut allchars,
                    ctx,
                );
            }
            PolicyType::EasyToRead => {
                self.add_random_chars(
                    FLAG_USE_LOWERCASE,
                    self.min_lowercase,
                    EASY_LOWER_CHARS,
                    &mut passwd,
                    &mut allchars,
                    ctx,
                );
                self.add_random_chars(
                    FLAG_USE_UPPERCASE,
                    self.min_uppercase,
                    EASY_UPPER_CHARS,
                    &mut passwd,
                    &mut allchars,
                    ctx,
                );
                self.add_random_chars(
                    FLAG_USE_DIGITS,
                    self.min_digits,
                    EASY_DIGITS,
                    &mut passwd,
                    &mut allchars,
                    ctx,
                );
                self.add_random_chars(
                    FLAG_USE_SYMBOLS,
                    self.min_symbols,
                    self.special_symbols.as_deref().unwrap_or(SYMBOLS_EASY),
                    &mut passwd,
                    &mut allchars,
                    ctx,
                );
            }
            PolicyType::Hexadecimal => {
                allchars.extend(HEX_DIGITS.chars());
            }
            PolicyType::Pronounceable => {
                return self.generate_pronounceable(ctx);
            }
        }

        // Fill the rest with the union of usable characters.
        if !allchars.is_empty() {
            while passwd.len() < self.length as usize {
                let idx = ctx.rng.random_range(0..allchars.len());
                passwd.push(allchars[idx]);
            }
        }

        passwd.shuffle(&mut *ctx.rng);
        passwd.into_iter().collect()
    }

    /// If `flag` is enabled, sample `count` characters from `chars` into
    /// the password and add the class to the fill pool.
    fn add_random_chars(
        &self,
        flag: u16,
        count: u32,
        chars: &str,
        passwd: &mut Vec<char>,
        allchars: &mut Vec<char>,
        ctx: &mut PolicyContext<'_>,
    ) {
        if !self.check_flags(flag) {
            return;
        }
        let class: Vec<char> = chars.chars().collect();
        if class.is_empty() {
            return;
        }
        for _ in 0..count {
            let idx = ctx.rng.random_range(0..class.len());
            passwd.push(class[idx]);
        }
        allchars.extend_from_slice(&class);
    }

    /// Generate a pronounceable password from the trigram table, then
    /// apply leet substitution and case flags.
    fn generate_pronounceable(&self, ctx: &mut PolicyContext<'_>) -> String {
        let length = self.length as usize;
        if length == 0 {
            return String::new();
        }

        let table = TrigramTable::get();
        let letter = |idx: usize| (b'a' + idx as u8) as char;
        let mut password: Vec<char> = Vec::with_capacity(length);

        // Seed from the full trigram distribution.  The statistics for
        // word-initial trigrams differ from the general population, but
        // close enough.
        let ranno = ctx.rng.random_range(0..=table.sigma());
        let (c1, c2, c3) = 'seed: {
            let mut sum = 0u64;
            let mut last = (0, 0, 0);
            for c1 in 0..26 {
                for c2 in 0..26 {
                    for c3 in 0..26 {
                        let f = table.freq(c1, c2, c3);
                        if f > 0 {
                            last = (c1, c2, c3);
                        }
                        sum += u64::from(f);
                        if sum > ranno {
                            break 'seed (c1, c2, c3);
                        }
                    }
                }
            }
            // The draw landed on the total itself; the last populated
            // trigram is the limiting choice.
            last
        };
        password.push(letter(c1));
        if length > 1 {
            password.push(letter(c2));
        }
        if length > 2 {
            password.push(letter(c3));
        }

        // Random walk on the last two characters.
        while password.len() < length {
            let n = password.len();
            let c1 = (password[n - 2] as u8 - b'a') as usize;
            let c2 = (password[n - 1] as u8 - b'a') as usize;
            let row = table.row_sum(c1, c2);
            if row == 0 {
                // Dead-end digraph; fall back to index 0.
                password.push('a');
                continue;
            }
            let ranno = ctx.rng.random_range(0..=row);
            let mut sum = 0u64;
            let mut appended = false;
            let mut last = 0;
            for c3 in 0..26 {
                let f = table.freq(c1, c2, c3);
                if f > 0 {
                    last = c3;
                }
                sum += u64::from(f);
                if sum > ranno {
                    password.push(letter(c3));
                    appended = true;
                    break;
                }
            }
            if !appended {
                password.push(letter(last));
            }
        }

        // Replace some characters with leet digits/symbols when those
        // classes are required.
        let use_symbols = self.check_flags(FLAG_USE_SYMBOLS);
        let use_digits = self.check_flags(FLAG_USE_DIGITS);
        if use_symbols || use_digits {
            let mut candidates: Vec<usize> = (0..password.len())
                .filter(|&i| {
                    let c = password[i];
                    (use_digits && leet_digit(c).is_some())
                        || (use_symbols && leet_symbol(c).is_some())
                })
                .collect();

            let sclen = candidates.len();
            if sclen > 0 {
                // Not too many, but at least one.
                let mut rn = 1;
                if sclen > 1 {
                    rn += ctx.rng.random_range(0..sclen - 1) / 2;
                }
                candidates.shuffle(&mut *ctx.rng);
                for &pw_idx in candidates.iter().take(rn) {
                    let c = password[pw_idx];
                    let mut digsub = if use_digits { leet_digit(c) } else { None };
                    let symsub = if use_symbols { leet_symbol(c) } else { None };
                    // Both possible: pick one with a fair coin.
                    if digsub.is_some() && symsub.is_some() && ctx.rng.random_bool(0.5) {
                        digsub = None;
                    }
                    password[pw_idx] = digsub.or(symsub).unwrap_or(c);
                }
            }
        }

        let use_lower = self.check_flags(FLAG_USE_LOWERCASE);
        let use_upper = self.check_flags(FLAG_USE_UPPERCASE);
        if !use_lower && use_upper {
            for c in &mut password {
                *c = c.to_ascii_uppercase();
            }
        } else if use_lower && use_upper {
            for c in &mut password {
                if c.is_ascii_alphabetic() && ctx.rng.random_bool(0.5) {
                    *c = c.to_ascii_uppercase();
                }
            }
        }

        password.into_iter().collect()
    }
}

impl std::fmt::Display for PasswdPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Explicit generation context: the random source and the configured
/// default symbol set.  Keeps generation free of process-wide state and
/// deterministic under a seeded source.
pub struct PolicyContext<'a> {
    rng: &'a mut dyn RngCore,
    default_symbols: Option<&'a str>,
}

impl<'a> PolicyContext<'a> {
    pub fn new(rng: &'a mut dyn RngCore, default_symbols: Option<&'a str>) -> Self {
        Self {
            rng,
            default_symbols,
        }
    }
}

fn clamp_length(length: u32) -> u32 {
    length.min(LENGTH_MAX)
}

/// Digit that can stand in for a letter, leet style.
fn leet_digit(c: char) -> Option<char> {
    match c {
        'a' => Some('4'),
        'b' => Some('8'),
        'e' => Some('3'),
        'g' => Some('6'),
        'i' | 'l' => Some('1'),
        'o' => Some('0'),
        's' => Some('5'),
        't' => Some('7'),
        'z' => Some('2'),
        _ => None,
    }
}

/// Symbol that can stand in for a letter, leet style.
fn leet_symbol(c: char) -> Option<char> {
    match c {
        'a' => Some('@'),
        'b' => Some('&'),
        'c' => Some('('),
        'h' => Some('#'),
        'i' => Some('!'),
        'l' => Some('|'),
        's' => Some('$'),
        't' => Some('+'),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse the header named-policy list.  The string must be consumed
/// exactly: trailing garbage after the declared count is an error.
pub fn parse_hdr_policies(policy_str: &str) -> Result<Vec<PasswdPolicy>> {
    let chars: Vec<char> = policy_str.chars().collect();
    if chars.len() < 2 {
        return Err(PsafeError::format(
            "password policy",
            format!("policies length ({}) too short: 2", chars.len()),
        ));
    }

    let num_policies = policy_str_int(&chars, 0, 0, 2, "policy count")? as usize;
    let mut policies = Vec::with_capacity(num_policies);
    let mut field_start = 2;
    for i in 0..num_policies {
        let (policy, end) = parse_hdr_policy(&chars, field_start, i, Location::Header)?;
        policies.push(policy);
        field_start = end;
    }

    if field_start != chars.len() {
        return Err(PsafeError::format(
            "password policy",
            "policies field does not end at the last policy",
        ));
    }

    Ok(policies)
}

/// Encode the header named-policy list.
pub fn hdr_policies_to_string(policies: &[PasswdPolicy]) -> String {
    let mut out = format!("{:02x}", policies.len());
    for policy in policies {
        out.push_str(&policy.to_hdr_policy_string());
    }
    out
}

/// Decode a record's policy from its three raw fields.
///
/// A policy name wins and produces a by-name reference that the caller
/// resolves against the header index; otherwise an inline policy string
/// is parsed.  Neither present means no policy.
pub fn parse_record_policy(
    policy_name: Option<&str>,
    policy_str: Option<&str>,
    own_symbols: Option<&str>,
) -> Result<Option<PasswdPolicy>> {
    if let Some(name) = policy_name {
        return Ok(Some(PasswdPolicy::new(name, Location::RecordName)));
    }
    if let Some(policy_str) = policy_str {
        let chars: Vec<char> = policy_str.chars().collect();
        // Characters past the fixed-width fields are tolerated.
        let fields = parse_policy_flags_and_lengths(&chars, 0, 0)?;
        return Ok(Some(PasswdPolicy::with_fields(
            "",
            Location::Record,
            fields.flags,
            fields.length,
            fields.min_lowercase,
            fields.min_uppercase,
            fields.min_digits,
            fields.min_symbols,
            own_symbols.map(str::to_owned),
        )));
    }
    Ok(None)
}

/// Encode a policy into the three record fields.  Default-location
/// policies serialize to nothing (all three fields removed).
pub fn record_policy_strings(policy: &PasswdPolicy) -> Option<RecordPolicyStrs> {
    match policy.location() {
        Location::Default => None,
        Location::Header | Location::RecordName => Some(RecordPolicyStrs {
            policy_name: Some(policy.name().to_owned()),
            policy_str: None,
            own_symbols: None,
        }),
        Location::Record => Some(RecordPolicyStrs {
            policy_name: None,
            policy_str: Some(policy.flags_and_lengths_to_string()),
            own_symbols: policy.special_symbols.clone(),
        }),
    }
}

struct ParsedFields {
    flags: u16,
    length: u32,
    min_lowercase: u32,
    min_uppercase: u32,
    min_digits: u32,
    min_symbols: u32,
    fields_end: usize,
}

/// Parse one header policy entry starting at `pos`; returns the policy
/// and the offset one past its end.
fn parse_hdr_policy(
    chars: &[char],
    pos: usize,
    policy_num: usize,
    location: Location,
) -> Result<(PasswdPolicy, usize)> {
    let mut field_start = pos;
    let name_len = policy_str_int(chars, policy_num, field_start, 2, "name length")? as usize;
    field_start += 2;

    let name: String = policy_str_field(chars, policy_num, field_start, name_len, "name")?
        .iter()
        .collect();
    field_start += name_len;

    let fields = parse_policy_flags_and_lengths(chars, policy_num, field_start)?;
    field_start = fields.fields_end;

    let num_specials =
        policy_str_int(chars, policy_num, field_start, 2, "special symbols length")? as usize;
    field_start += 2;
    let mut special_symbols = None;
    if num_specials > 0 {
        special_symbols = Some(
            policy_str_field(chars, policy_num, field_start, num_specials, "special symbols")?
                .iter()
                .collect::<String>(),
        );
        field_start += num_specials;
    }

    let policy = PasswdPolicy::with_fields(
        name,
        location,
        fields.flags,
        fields.length,
        fields.min_lowercase,
        fields.min_uppercase,
        fields.min_digits,
        fields.min_symbols,
        special_symbols,
    );
    Ok((policy, field_start))
}

/// Parse the fixed-width flags and lengths block at `field_start`.
fn parse_policy_flags_and_lengths(
    chars: &[char],
    policy_num: usize,
    field_start: usize,
) -> Result<ParsedFields> {
    let mut pos = field_start;
    let flags = policy_str_int(chars, policy_num, pos, 4, "flags")?;
    pos += 4;
    let length = policy_str_int(chars, policy_num, pos, 3, "password length")?;
    pos += 3;
    let min_digits = policy_str_int(chars, policy_num, pos, 3, "min digit chars")?;
    pos += 3;
    let min_lowercase = policy_str_int(chars, policy_num, pos, 3, "min lowercase chars")?;
    pos += 3;
    let min_symbols = policy_str_int(chars, policy_num, pos, 3, "min symbol chars")?;
    pos += 3;
    let min_uppercase = policy_str_int(chars, policy_num, pos, 3, "min uppercase chars")?;
    pos += 3;

    Ok(ParsedFields {
        flags: flags as u16,
        length,
        min_lowercase,
        min_uppercase,
        min_digits,
        min_symbols,
        fields_end: pos,
    })
}

/// Read a fixed-width hex integer out of a policy string.
fn policy_str_int(
    chars: &[char],
    policy_num: usize,
    field_start: usize,
    field_len: usize,
    field_name: &'static str,
) -> Result<u32> {
    let field = policy_str_field(chars, policy_num, field_start, field_len, field_name)?;
    let mut value = 0u32;
    for &c in field {
        let digit = c.to_digit(16).ok_or_else(|| {
            PsafeError::format(
                "password policy",
                format!("policy {policy_num} has invalid hex in {field_name}"),
            )
        })?;
        value = (value << 4) | digit;
    }
    Ok(value)
}

/// Slice a fixed-width field out of a policy string.
fn policy_str_field<'a>(
    chars: &'a [char],
    policy_num: usize,
    field_start: usize,
    field_len: usize,
    field_name: &'static str,
) -> Result<&'a [char]> {
    if chars.len() < field_start + field_len {
        return Err(PsafeError::format(
            "password policy",
            format!("policy {policy_num} too short for {field_name}: {field_len}"),
        ));
    }
    Ok(&chars[field_start..field_start + field_len])
}
