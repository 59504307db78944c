use std::error::Error;

use clap::{Args, Parser, Subcommand};
use engine::{Engine, MoneyCents, SignUpCmd};
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection};
use uuid::Uuid;

mod prompt;

#[derive(Parser, Debug)]
#[command(name = "splitroom_admin")]
#[command(about = "Admin utilities for Splitroom (bootstrap users, rooms and accounts)")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite:./splitroom.db?mode=rwc"
    )]
    database_url: String,

    /// Room joined by users created here.
    #[arg(long, env = "SPLITROOM__SERVER__DEFAULT_ROOM")]
    default_room: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    User(User),
    Room(Room),
    Account(Account),
}

#[derive(Args, Debug)]
struct User {
    #[command(subcommand)]
    command: UserCommand,
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    /// Register a user; the password is asked on the terminal.
    Create(UserCreateArgs),
}

#[derive(Args, Debug)]
struct UserCreateArgs {
    #[arg(long)]
    first_name: String,
    #[arg(long)]
    last_name: String,
    #[arg(long)]
    email: String,
}

#[derive(Args, Debug)]
struct Room {
    #[command(subcommand)]
    command: RoomCommand,
}

#[derive(Subcommand, Debug)]
enum RoomCommand {
    Create(RoomCreateArgs),
    /// Add an existing user to a room, on behalf of the room creator.
    AddUser(RoomAddUserArgs),
}

#[derive(Args, Debug)]
struct RoomCreateArgs {
    #[arg(long)]
    owner_email: String,
    #[arg(long)]
    name: String,
}

#[derive(Args, Debug)]
struct RoomAddUserArgs {
    #[arg(long)]
    room_id: Uuid,
    #[arg(long)]
    email: String,
}

#[derive(Args, Debug)]
struct Account {
    #[command(subcommand)]
    command: AccountCommand,
}

#[derive(Subcommand, Debug)]
enum AccountCommand {
    Create(AccountCreateArgs),
}

#[derive(Args, Debug)]
struct AccountCreateArgs {
    #[arg(long)]
    owner_email: String,
    #[arg(long)]
    name: String,
    /// Opening balance, e.g. `12.34`.
    #[arg(long, default_value = "0")]
    balance: MoneyCents,
}

async fn connect_db(
    database_url: &str,
) -> Result<DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let db = Database::connect(database_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();

    let db = connect_db(&cli.database_url).await?;
    let mut builder = Engine::builder().database(db);
    if let Some(room) = cli.default_room {
        builder = builder.default_room(room);
    }
    let engine = builder.build().await?;

    match cli.command {
        Command::User(User {
            command: UserCommand::Create(args),
        }) => {
            let password = prompt::new_password()?;
            let signed = engine
                .sign_up(SignUpCmd::new(
                    args.first_name,
                    args.last_name,
                    args.email,
                    password,
                ))
                .await?;
            // the session opened by sign up is of no use here
            engine.sign_out(&signed.token).await?;

            println!("created user: {} ({})", signed.user.email, signed.user.id);
            if let Some(room) = signed.default_room {
                println!("joined room: {} ({})", room.name, room.id);
            }
        }
        Command::Room(Room {
            command: RoomCommand::Create(args),
        }) => {
            let owner = engine.user_by_email(&args.owner_email).await?;
            let room = engine.new_room(&args.name, owner.id).await?;
            println!("created room: {} ({})", room.name, room.id);
        }
        Command::Room(Room {
            command: RoomCommand::AddUser(args),
        }) => {
            let room = engine.room(args.room_id).await?;
            let user = engine.user_by_email(&args.email).await?;
            let added = engine
                .add_users_to_room(room.id, &[user.id], room.created_by)
                .await?;
            if added.is_empty() {
                println!("{} is already in {}", user.email, room.name);
            } else {
                println!("added {} to {}", user.email, room.name);
            }
        }
        Command::Account(Account {
            command: AccountCommand::Create(args),
        }) => {
            let owner = engine.user_by_email(&args.owner_email).await?;
            let account = engine
                .new_account(owner.id, &args.name, args.balance.cents())
                .await?;
            println!(
                "created account: {} ({}) balance {}",
                account.name,
                account.id,
                MoneyCents::new(account.balance_minor)
            );
        }
    }

    Ok(())
}
