//! `psafe gen` — generate passwords without touching any record.

use rand::rng;

use crate::cli::{open_file, resolve_file, Cli};
use crate::config::Settings;
use crate::errors::{PsafeError, Result};
use crate::file::policy::{
    FLAG_MAKE_PRONOUNCEABLE, FLAG_USE_DIGITS, FLAG_USE_EASY_VISION, FLAG_USE_HEX_DIGITS,
    FLAG_USE_LOWERCASE, FLAG_USE_SYMBOLS, FLAG_USE_UPPERCASE,
};
use crate::file::{Location, PasswdPolicy, PolicyContext};

/// Options carried over from the parsed `gen` arguments.
pub struct GenArgs<'a> {
    pub length: u32,
    pub policy: Option<&'a str>,
    pub count: usize,
    pub pronounceable: bool,
    pub easy: bool,
    pub hex: bool,
    pub no_upper: bool,
    pub no_digits: bool,
    pub no_symbols: bool,
    pub symbols: Option<&'a str>,
}

/// Execute the `gen` command.
pub fn execute(cli: &Cli, args: &GenArgs<'_>) -> Result<()> {
    let policy = match args.policy {
        // A named policy comes from the file header, so this variant
        // needs the file open (and its passphrase).
        Some(name) => {
            let (path, _settings) = resolve_file(cli)?;
            let file_data = open_file(&path)?;
            file_data
                .hdr_policies()
                .get(name)
                .cloned()
                .ok_or_else(|| PsafeError::PolicyNotFound(name.to_string()))?
        }
        None => policy_from_flags(args),
    };

    let settings = Settings::load(&std::env::current_dir()?)?;
    let mut rng = rng();
    let mut ctx = PolicyContext::new(&mut rng, settings.default_symbols.as_deref());

    for _ in 0..args.count.max(1) {
        println!("{}", policy.generate(&mut ctx));
    }

    Ok(())
}

/// Build an unnamed policy from the command-line flags.
fn policy_from_flags(args: &GenArgs<'_>) -> PasswdPolicy {
    let mut flags = FLAG_USE_LOWERCASE;
    if !args.no_upper {
        flags |= FLAG_USE_UPPERCASE;
    }
    if !args.no_digits {
        flags |= FLAG_USE_DIGITS;
    }
    if !args.no_symbols {
        flags |= FLAG_USE_SYMBOLS;
    }
    if args.pronounceable {
        flags |= FLAG_MAKE_PRONOUNCEABLE;
    }
    if args.easy {
        flags |= FLAG_USE_EASY_VISION;
    }
    if args.hex {
        flags = FLAG_USE_HEX_DIGITS;
    }

    PasswdPolicy::with_fields(
        "",
        Location::Default,
        flags,
        args.length,
        1,
        u32::from(!args.no_upper),
        u32::from(!args.no_digits),
        u32::from(!args.no_symbols),
        args.symbols.map(str::to_string),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> GenArgs<'static> {
        GenArgs {
            length: 12,
            policy: None,
            count: 1,
            pronounceable: false,
            easy: false,
            hex: false,
            no_upper: false,
            no_digits: false,
            no_symbols: false,
            symbols: None,
        }
    }

    #[test]
    fn flags_default_to_all_classes() {
        let p = policy_from_flags(&args());
        assert!(p.check_flags(FLAG_USE_LOWERCASE));
        assert!(p.check_flags(FLAG_USE_UPPERCASE));
        assert!(p.check_flags(FLAG_USE_DIGITS));
        assert!(p.check_flags(FLAG_USE_SYMBOLS));
    }

    #[test]
    fn no_flags_drop_classes() {
        let mut a = args();
        a.no_upper = true;
        a.no_symbols = true;
        let p = policy_from_flags(&a);
        assert!(!p.check_flags(FLAG_USE_UPPERCASE));
        assert!(!p.check_flags(FLAG_USE_SYMBOLS));
        assert!(p.check_flags(FLAG_USE_DIGITS));
        assert_eq!(p.min_uppercase(), 0);
        assert_eq!(p.min_symbols(), 0);
    }

    #[test]
    fn hex_overrides_classes() {
        let mut a = args();
        a.hex = true;
        let p = policy_from_flags(&a);
        assert!(p.check_flags(FLAG_USE_HEX_DIGITS));
        assert!(!p.check_flags(FLAG_USE_LOWERCASE));
    }

    #[test]
    fn custom_symbols_carried() {
        let mut a = args();
        a.symbols = Some("@#$");
        let p = policy_from_flags(&a);
        assert_eq!(p.special_symbols(), Some("@#$"));
    }
}
