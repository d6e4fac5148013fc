use clap::{
    builder::{
        styling::{AnsiColor, Effects, Styles},
        ValueParser,
    },
    Arg, ArgAction, ColorChoice, Command,
};

pub fn validator_log_level() -> ValueParser {
    ValueParser::from(move |level: &str| -> std::result::Result<u8, String> {
        if let Ok(parsed) = level.parse::<u8>() {
            // Successfully parsed as a number
            if parsed <= 5 {
                return Ok(parsed);
            }
        }

        match level.to_lowercase().as_str() {
            "error" => Ok(0),
            "warn" => Ok(1),
            "info" => Ok(2),
            "debug" => Ok(3),
            "trace" => Ok(4),
            _ => Err("invalid log level".to_string()),
        }
    })
}

fn request_command() -> Command {
    Command::new("request")
        .about("Send one request through the refresh coordinator")
        .arg(
            Arg::new("path")
                .help("Path relative to the base URL, or an absolute URL")
                .required(true),
        )
        .arg(
            Arg::new("method")
                .short('X')
                .long("method")
                .help("HTTP method")
                .default_value("GET"),
        )
        .arg(
            Arg::new("header")
                .short('H')
                .long("header")
                .help("Extra header, 'Name: value' (repeatable)")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("data")
                .short('d')
                .long("data")
                .help("Request body; JSON bodies get a JSON content type"),
        )
}

fn login_command() -> Command {
    Command::new("login")
        .about("Store credentials in the token file")
        .arg(
            Arg::new("access-token")
                .long("access-token")
                .help("Access token")
                .env("REAUTH_ACCESS_TOKEN")
                .hide_env_values(true)
                .required_unless_present("refresh-token"),
        )
        .arg(
            Arg::new("refresh-token")
                .long("refresh-token")
                .help("Refresh token")
                .env("REAUTH_REFRESH_TOKEN")
                .hide_env_values(true),
        )
        .arg(
            Arg::new("expires-in")
                .long("expires-in")
                .help("Access token lifetime in seconds")
                .value_parser(clap::value_parser!(u64)),
        )
}

pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    Command::new("reauth")
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("base-url")
                .short('u')
                .long("base-url")
                .help("API base URL, example: https://api.example.com/api")
                .env("REAUTH_BASE_URL")
                .global(true),
        )
        .arg(
            Arg::new("token-file")
                .long("token-file")
                .help("Token file (default: $XDG_CONFIG_HOME/reauth/tokens.json)")
                .env("REAUTH_TOKEN_FILE")
                .global(true),
        )
        .arg(
            Arg::new("refresh-path")
                .long("refresh-path")
                .help("Token refresh endpoint path")
                .default_value(crate::config::DEFAULT_REFRESH_PATH)
                .env("REAUTH_REFRESH_PATH")
                .global(true),
        )
        .arg(
            Arg::new("auth-failure-status")
                .long("auth-failure-status")
                .help("Status code(s) treated as an expired access token (default: 401)")
                .env("REAUTH_AUTH_FAILURE_STATUS")
                .value_delimiter(',')
                .action(ArgAction::Append)
                .value_parser(clap::value_parser!(u16).range(100..=599))
                .global(true),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .help("Per-request timeout in seconds")
                .default_value("10")
                .env("REAUTH_TIMEOUT")
                .value_parser(clap::value_parser!(u64).range(1..))
                .global(true),
        )
        .arg(
            Arg::new("verbosity")
                .short('v')
                .long("verbose")
                .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
                .env("REAUTH_LOG_LEVEL")
                .global(true)
                .action(ArgAction::Count)
                .value_parser(validator_log_level()),
        )
        .subcommand(request_command())
        .subcommand(login_command())
        .subcommand(Command::new("logout").about("Remove stored credentials"))
        .subcommand(
            Command::new("status").about("Show which credentials are stored, without the tokens"),
        )
}
