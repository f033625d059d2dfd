use std::io;
use std::path;
use std::sync::Arc;

use anyhow::bail;
use anyhow::Result;
use clap::value_parser;
use clap::Arg;
use clap::ArgAction;
use clap::ArgMatches;
use clap::Command;
use clap_complete::generate;
use clap_complete::Generator;
use clap_complete::Shell;
use dialoguer::theme::ColorfulTheme;
use dialoguer::Confirm;
use dialoguer::Password;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use yansi::Paint;

use crate::application::render;
use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::BookApiBox;
use crate::domain::models::BookDraft;
use crate::domain::models::ImageAttachment;
use crate::domain::models::UNAUTHENTICATED_MESSAGE;
use crate::domain::services::Composer;
use crate::domain::services::FeedPager;
use crate::domain::services::FeedSource;
use crate::domain::services::SessionStore;
use crate::infrastructure::api::HttpApi;
use crate::infrastructure::storage::FileStore;

fn print_completions<G: Generator>(gen: G, cmd: &mut Command) {
    generate(gen, cmd, cmd.get_name().to_string(), &mut io::stdout());
}

async fn create_config_file() -> Result<()> {
    let config_file_path_str = Config::default(ConfigKey::ConfigFile);
    let config_file_path = path::PathBuf::from(&config_file_path_str);
    if config_file_path.exists() {
        bail!(format!(
            "Config file already exists at {config_file_path_str}"
        ));
    }

    if let Some(parent) = config_file_path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent).await?;
        }
    }

    let mut file = fs::File::create(&config_file_path).await?;
    file.write_all(Config::serialize_default(build()).as_bytes())
        .await?;

    println!(
        "Created default config file at {}",
        config_file_path.display()
    );
    return Ok(());
}

fn subcommand_completions() -> Command {
    return Command::new("completions")
        .about("Generates shell completions.")
        .arg(
            Arg::new("shell")
                .short('s')
                .long("shell")
                .help("Which shell to generate completions for.")
                .action(ArgAction::Set)
                .value_parser(value_parser!(Shell))
                .required(true),
        );
}

fn subcommand_config() -> Command {
    return Command::new("config")
        .about("Configuration file options.")
        .subcommand(
            Command::new("create").about("Saves the default config file to the configuration file path. This command will fail if the file exists already.")
        )
        .subcommand(
            Command::new("default").about("Outputs the default configuration file to stdout.")
        )
        .subcommand(
            Command::new("path").about("Returns the default path for the configuration file.")
        );
}

fn arg_email() -> Arg {
    return Arg::new("email")
        .short('e')
        .long("email")
        .help("Account email address.")
        .num_args(1)
        .required(true);
}

fn arg_password() -> Arg {
    return Arg::new("password")
        .short('p')
        .long("password")
        .env("BOOKWORM_PASSWORD")
        .hide_env_values(true)
        .help("Account password. Prompted for when omitted.")
        .num_args(1);
}

fn arg_yes() -> Arg {
    return Arg::new("yes")
        .short('y')
        .long("yes")
        .help("Skip the confirmation prompt.")
        .action(ArgAction::SetTrue);
}

fn subcommand_register() -> Command {
    return Command::new("register")
        .about("Create an account and sign in.")
        .arg(
            Arg::new("username")
                .short('u')
                .long("username")
                .help("Name shown next to your recommendations.")
                .num_args(1)
                .required(true),
        )
        .arg(arg_email())
        .arg(arg_password());
}

fn subcommand_login() -> Command {
    return Command::new("login")
        .about("Sign in to an existing account.")
        .arg(arg_email())
        .arg(arg_password());
}

fn subcommand_feed() -> Command {
    return Command::new("feed")
        .about("Show the latest recommendations from the community.")
        .arg(
            Arg::new("pages")
                .short('n')
                .long("pages")
                .help("How many pages to load.")
                .num_args(1)
                .default_value("1")
                .value_parser(value_parser!(u32).range(1..)),
        );
}

fn subcommand_delete() -> Command {
    return Command::new("delete")
        .about("Delete one of your recommendations.")
        .arg(
            Arg::new("id")
                .short('i')
                .long("id")
                .help("Recommendation ID, as shown by `bookworm mine`.")
                .num_args(1)
                .required(true),
        )
        .arg(arg_yes());
}

fn subcommand_create() -> Command {
    return Command::new("create")
        .about("Share a new book recommendation.")
        .arg(
            Arg::new("title")
                .short('t')
                .long("title")
                .help("Book title.")
                .num_args(1)
                .required(true),
        )
        .arg(
            Arg::new("caption")
                .long("caption")
                .help("What you thought of it.")
                .num_args(1)
                .required(true),
        )
        .arg(
            Arg::new("rating")
                .short('r')
                .long("rating")
                .help("Rating from 1 to 5.")
                .num_args(1)
                .default_value("3")
                .value_parser(value_parser!(u8)),
        )
        .arg(
            Arg::new("image")
                .long("image")
                .help("Path to the cover image.")
                .num_args(1)
                .value_parser(value_parser!(path::PathBuf))
                .required(true),
        );
}

pub fn build() -> Command {
    let about = format!(
        "{}\n\nVersion: {}",
        env!("CARGO_PKG_DESCRIPTION"),
        env!("CARGO_PKG_VERSION"),
    );

    return Command::new("bookworm")
        .about(about)
        .author(env!("CARGO_PKG_AUTHORS"))
        .version(env!("CARGO_PKG_VERSION"))
        .arg_required_else_help(false)
        .subcommand(subcommand_register())
        .subcommand(subcommand_login())
        .subcommand(
            Command::new("logout")
                .about("Sign out and forget the stored session.")
                .arg(arg_yes()),
        )
        .subcommand(Command::new("whoami").about("Show the signed in profile."))
        .subcommand(subcommand_feed())
        .subcommand(Command::new("mine").about("List your own recommendations."))
        .subcommand(subcommand_delete())
        .subcommand(subcommand_create())
        .subcommand(subcommand_completions())
        .subcommand(subcommand_config())
        .arg(
            Arg::new(ConfigKey::ConfigFile.to_string())
                .short('c')
                .long(ConfigKey::ConfigFile.to_string())
                .env("BOOKWORM_CONFIG_FILE")
                .num_args(1)
                .help(format!("Path to configuration file [default: {}]", Config::default(ConfigKey::ConfigFile)))
                .global(true)
        )
        .arg(
            Arg::new(ConfigKey::BackendURL.to_string())
                .long(ConfigKey::BackendURL.to_string())
                .env("BOOKWORM_BACKEND_URL")
                .num_args(1)
                .help(format!("Bookworm API root URL. [default: {}]", Config::default(ConfigKey::BackendURL)))
                .global(true),
        )
        .arg(
            Arg::new(ConfigKey::DataDir.to_string())
                .long(ConfigKey::DataDir.to_string())
                .env("BOOKWORM_DATA_DIR")
                .num_args(1)
                .help(format!("Directory the signed in session is stored in. [default: {}]", Config::default(ConfigKey::DataDir)))
                .global(true),
        )
        .arg(
            Arg::new(ConfigKey::PageSize.to_string())
                .long(ConfigKey::PageSize.to_string())
                .env("BOOKWORM_PAGE_SIZE")
                .num_args(1)
                .help(format!("Recommendations requested per feed page. [default: {}]", Config::default(ConfigKey::PageSize)))
                .global(true),
        )
        .arg(
            Arg::new(ConfigKey::RequestTimeout.to_string())
                .long(ConfigKey::RequestTimeout.to_string())
                .env("BOOKWORM_REQUEST_TIMEOUT")
                .num_args(1)
                .help(format!("Time to wait in milliseconds before a request to the backend times out. [default: {}]", Config::default(ConfigKey::RequestTimeout)))
                .global(true),
        );
}

/// Backend and restored session shared by every account command.
struct Client {
    api: BookApiBox,
    store: SessionStore,
}

impl Client {
    async fn connect(matches: &ArgMatches, subcmd_matches: &ArgMatches) -> Result<Client> {
        Config::load(build(), vec![matches, subcmd_matches]).await?;

        let api: BookApiBox = Arc::new(HttpApi::default());
        let store = SessionStore::create(api.clone(), Arc::new(FileStore::default())).await;

        return Ok(Client { api, store });
    }

    fn require_session(&self) -> Result<()> {
        if !self.store.handle().is_authenticated() {
            bail!(UNAUTHENTICATED_MESSAGE);
        }
        return Ok(());
    }

    fn pager(&self, source: FeedSource) -> Result<FeedPager> {
        let page_size = Config::get(ConfigKey::PageSize).parse::<u32>()?;
        return Ok(FeedPager::new(
            self.api.clone(),
            self.store.handle(),
            source,
            page_size,
        ));
    }
}

fn read_password(matches: &ArgMatches) -> Result<String> {
    if let Some(password) = matches.get_one::<String>("password") {
        return Ok(password.to_string());
    }

    let password = Password::with_theme(&ColorfulTheme::default())
        .with_prompt("Password")
        .interact()?;

    return Ok(password);
}

fn confirm(prompt: &str, matches: &ArgMatches) -> Result<bool> {
    if matches.get_flag("yes") {
        return Ok(true);
    }

    let res = Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .default(false)
        .interact()?;

    return Ok(res);
}

fn required<'a>(matches: &'a ArgMatches, id: &str) -> Result<&'a String> {
    return match matches.get_one::<String>(id) {
        Some(val) => Ok(val),
        None => bail!(format!("Missing required argument '{id}'")),
    };
}

async fn run_register(client: &Client, matches: &ArgMatches) -> Result<()> {
    let username = required(matches, "username")?;
    let email = required(matches, "email")?;
    let password = read_password(matches)?;

    let session = client.store.register(username, email, &password).await?;
    println!("Welcome to Bookworm, {}!", Paint::new(&session.user.username).bold());

    return Ok(());
}

async fn run_login(client: &Client, matches: &ArgMatches) -> Result<()> {
    let email = required(matches, "email")?;
    let password = read_password(matches)?;

    let session = client.store.login(email, &password).await?;
    println!("Welcome back, {}!", Paint::new(&session.user.username).bold());

    return Ok(());
}

async fn run_logout(client: &Client, matches: &ArgMatches) -> Result<()> {
    if client.store.session().is_none() {
        println!("You are not logged in.");
        return Ok(());
    }

    if !confirm("Are you sure you want to logout?", matches)? {
        return Ok(());
    }

    client.store.logout().await;
    println!("Logged out.");

    return Ok(());
}

fn run_whoami(client: &Client) -> Result<()> {
    let Some(user) = client.store.user() else {
        bail!(UNAUTHENTICATED_MESSAGE);
    };

    println!("{}", render::format_profile(&user));
    return Ok(());
}

async fn run_feed(client: &Client, matches: &ArgMatches) -> Result<()> {
    client.require_session()?;
    let pages = matches.get_one::<u32>("pages").copied().unwrap_or(1);

    let pager = client.pager(FeedSource::Community)?;
    pager.load_initial().await?;
    for _ in 1..pages {
        if !pager.has_more() {
            break;
        }
        pager.load_more().await?;
    }

    println!("{}", render::format_items(&pager.items(), false));
    if pager.has_more() {
        println!(
            "\n{}",
            Paint::new(format!(
                "More recommendations available, run with --pages {} to see them.",
                pager.page_number() + 1
            ))
            .dimmed()
        );
    }

    return Ok(());
}

async fn run_mine(client: &Client) -> Result<()> {
    let Some(user) = client.store.user() else {
        bail!(UNAUTHENTICATED_MESSAGE);
    };

    let pager = client.pager(FeedSource::Mine)?;
    pager.load_initial().await?;

    println!("{}", render::format_profile(&user));
    println!("\n{}\n", render::format_books_count(pager.len()));
    println!("{}", render::format_items(&pager.items(), true));

    return Ok(());
}

async fn run_delete(client: &Client, matches: &ArgMatches) -> Result<()> {
    client.require_session()?;
    let id = required(matches, "id")?;

    let pager = client.pager(FeedSource::Mine)?;
    pager.load_initial().await?;
    let Some(item) = pager.items().into_iter().find(|item| return &item.id == id) else {
        bail!(format!("You have no recommendation with ID {id}"));
    };

    if !confirm(
        &format!("Are you sure you want to delete \"{}\"?", item.title),
        matches,
    )? {
        return Ok(());
    }

    pager.delete_item(id).await?;
    println!("Deleted \"{}\".", item.title);

    return Ok(());
}

async fn run_create(client: &Client, matches: &ArgMatches) -> Result<()> {
    client.require_session()?;
    let Some(image_path) = matches.get_one::<path::PathBuf>("image") else {
        bail!("Missing required argument 'image'");
    };

    let draft = BookDraft {
        title: required(matches, "title")?.to_string(),
        caption: required(matches, "caption")?.to_string(),
        rating: matches.get_one::<u8>("rating").copied().unwrap_or_default(),
        image: Some(ImageAttachment::from_path(image_path).await?),
    };

    let message = Composer::new(client.api.clone(), client.store.handle())
        .publish(&draft)
        .await?;
    println!("{message}");

    return Ok(());
}

pub async fn parse() -> Result<()> {
    let matches = build().get_matches();

    match matches.subcommand() {
        Some(("completions", subcmd_matches)) => {
            if let Some(completions) = subcmd_matches.get_one::<Shell>("shell").copied() {
                let mut app = build();
                print_completions(completions, &mut app);
            }
        }
        Some(("config", subcmd_matches)) => match subcmd_matches.subcommand() {
            Some(("create", _)) => {
                create_config_file().await?;
            }
            Some(("default", _)) => {
                println!("{}", Config::serialize_default(build()));
            }
            Some(("path", _)) => {
                println!("{}", Config::default(ConfigKey::ConfigFile));
            }
            _ => {
                subcommand_config().print_long_help()?;
            }
        },
        Some((name, subcmd_matches)) => {
            let client = Client::connect(&matches, subcmd_matches).await?;
            match name {
                "register" => run_register(&client, subcmd_matches).await?,
                "login" => run_login(&client, subcmd_matches).await?,
                "logout" => run_logout(&client, subcmd_matches).await?,
                "whoami" => run_whoami(&client)?,
                "feed" => run_feed(&client, subcmd_matches).await?,
                "mine" => run_mine(&client).await?,
                "delete" => run_delete(&client, subcmd_matches).await?,
                "create" => run_create(&client, subcmd_matches).await?,
                _ => build().print_long_help()?,
            }
        }
        None => {
            build().print_long_help()?;
        }
    }

    return Ok(());
}
