use clap::Parser;
use psafe::cli::commands::{add::AddArgs, edit::EditArgs, gen::GenArgs, history_cmd::HistoryArgs};
use psafe::cli::{AuthAction, Cli, Commands, PolicyAction};
use psafe::file::RecordType;

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init => psafe::cli::commands::init::execute(&cli),
        Commands::List => psafe::cli::commands::list::execute(&cli),
        Commands::Show {
            ref query,
            password,
            copy,
        } => psafe::cli::commands::show::execute(&cli, query, password, copy),
        Commands::Add {
            ref title,
            ref group,
            ref username,
            ref url,
            ref email,
            ref notes,
            ref password,
            generate,
        } => psafe::cli::commands::add::execute(
            &cli,
            &AddArgs {
                title,
                group: group.as_deref(),
                username: username.as_deref(),
                url: url.as_deref(),
                email: email.as_deref(),
                notes: notes.as_deref(),
                password: password.as_deref(),
                generate,
            },
        ),
        Commands::Edit {
            ref query,
            ref title,
            ref group,
            ref username,
            ref url,
            ref email,
            ref notes,
            clear_group,
            clear_username,
            clear_url,
            clear_email,
            clear_notes,
            protect,
            unprotect,
        } => psafe::cli::commands::edit::execute(
            &cli,
            query,
            &EditArgs {
                title: title.as_deref(),
                group: group.as_deref(),
                username: username.as_deref(),
                url: url.as_deref(),
                email: email.as_deref(),
                notes: notes.as_deref(),
                clear_group,
                clear_username,
                clear_url,
                clear_email,
                clear_notes,
                protect,
                unprotect,
            },
        ),
        Commands::Rm { ref query, force } => psafe::cli::commands::rm::execute(&cli, query, force),
        Commands::Passwd {
            ref query,
            generate,
        } => psafe::cli::commands::passwd::execute(&cli, query, generate),
        Commands::Gen {
            length,
            ref policy,
            count,
            pronounceable,
            easy,
            hex,
            no_upper,
            no_digits,
            no_symbols,
            ref symbols,
        } => psafe::cli::commands::gen::execute(
            &cli,
            &GenArgs {
                length,
                policy: policy.as_deref(),
                count,
                pronounceable,
                easy,
                hex,
                no_upper,
                no_digits,
                no_symbols,
                symbols: symbols.as_deref(),
            },
        ),
        Commands::History {
            ref query,
            enable,
            disable,
            max_size,
            clear,
        } => psafe::cli::commands::history_cmd::execute(
            &cli,
            query,
            &HistoryArgs {
                enable,
                disable,
                max_size,
                clear,
            },
        ),
        Commands::Policy { ref action } => match action {
            PolicyAction::List => psafe::cli::commands::policy_cmd::execute_list(&cli),
            PolicyAction::Show { ref name } => {
                psafe::cli::commands::policy_cmd::execute_show(&cli, name)
            }
            PolicyAction::Rename {
                ref old_name,
                ref new_name,
            } => psafe::cli::commands::policy_cmd::execute_rename(&cli, old_name, new_name),
        },
        Commands::Alias {
            ref query,
            ref target,
        } => psafe::cli::commands::reference::execute(&cli, query, target, RecordType::Alias),
        Commands::Shortcut {
            ref query,
            ref target,
        } => psafe::cli::commands::reference::execute(&cli, query, target, RecordType::Shortcut),
        Commands::Find {
            ref pattern,
            case_sensitive,
        } => psafe::cli::commands::find::execute(&cli, pattern, case_sensitive),
        Commands::Info => psafe::cli::commands::info::execute(&cli),
        Commands::Completions { ref shell } => psafe::cli::commands::completions::execute(shell),
        Commands::Audit { last, ref since } => {
            psafe::cli::commands::audit_cmd::execute(&cli, last, since.as_deref())
        }
        Commands::Auth { ref action } => match action {
            AuthAction::Keyring { delete } => {
                psafe::cli::commands::auth::execute_keyring(&cli, *delete)
            }
        },
    };

    if let Err(e) = result {
        psafe::cli::output::error(&e.to_string());
        std::process::exit(1);
    }
}
