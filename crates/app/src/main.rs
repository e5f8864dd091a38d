use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use engine::{
    Engine, EngineError, ExpenseDraft, MoneyCents, NewTrip, Participant, ParticipantId,
    QuickSplit, SqlStore, Trip,
};
use migration::{Migrator, MigratorTrait};
use settings::Database;

mod settings;

type ResultApp<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

#[derive(Parser, Debug)]
#[command(name = "tripsplit")]
#[command(about = "Split shared trip expenses and track who owes whom")]
struct Cli {
    /// Settings file (TOML, extension optional).
    #[arg(long, env = "TRIPSPLIT_CONFIG")]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Trip(TripCmd),
    Expense(ExpenseCmd),
    /// Split an amount equally between a number of people, without a trip.
    Split(SplitArgs),
    /// Net balance of every participant of a trip.
    Balances(TripRef),
    /// Replace every stored trip with the demo data set.
    Seed,
}

#[derive(Args, Debug)]
struct TripCmd {
    #[command(subcommand)]
    command: TripCommand,
}

#[derive(Subcommand, Debug)]
enum TripCommand {
    Create(TripCreateArgs),
    Join(TripJoinArgs),
    List,
    Show(TripRef),
}

#[derive(Args, Debug)]
struct Identity {
    /// Participant id of the caller.
    #[arg(long = "as")]
    id: String,
    #[arg(long)]
    display_name: Option<String>,
}

impl Identity {
    fn participant(&self) -> Participant {
        Participant::new(self.id.as_str(), self.display_name.as_deref())
    }
}

#[derive(Args, Debug)]
struct TripCreateArgs {
    #[arg(long)]
    name: String,
    #[arg(long, default_value = "")]
    description: String,
    /// First day of the trip (YYYY-MM-DD).
    #[arg(long, value_parser = parse_day)]
    start: DateTime<Utc>,
    /// Last day of the trip (YYYY-MM-DD).
    #[arg(long, value_parser = parse_day)]
    end: DateTime<Utc>,
    #[command(flatten)]
    identity: Identity,
}

#[derive(Args, Debug)]
struct TripJoinArgs {
    #[arg(long)]
    code: String,
    #[command(flatten)]
    identity: Identity,
}

#[derive(Args, Debug)]
struct TripRef {
    #[arg(long)]
    trip: String,
}

#[derive(Args, Debug)]
struct ExpenseCmd {
    #[command(subcommand)]
    command: ExpenseCommand,
}

#[derive(Subcommand, Debug)]
enum ExpenseCommand {
    Add(ExpenseAddArgs),
}

#[derive(Args, Debug)]
struct ExpenseAddArgs {
    #[arg(long)]
    trip: String,
    #[arg(long, default_value = "")]
    description: String,
    #[arg(long, default_value = "")]
    amount: String,
    #[arg(long)]
    paid_by: String,
    /// Comma separated participant ids.
    #[arg(long, value_delimiter = ',')]
    split: Vec<String>,
    #[arg(long)]
    category: Option<String>,
    /// Day of the expense (YYYY-MM-DD), today when omitted.
    #[arg(long, value_parser = parse_day)]
    date: Option<DateTime<Utc>>,
}

#[derive(Args, Debug)]
struct SplitArgs {
    #[arg(long, default_value = "")]
    description: String,
    #[arg(long, default_value = "")]
    amount: String,
    #[arg(long, default_value = "")]
    participants: String,
    #[arg(long, default_value = "me")]
    paid_by: String,
}

fn parse_day(raw: &str) -> Result<DateTime<Utc>, String> {
    let day = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("invalid date {raw}: {err}"))?;
    Ok(day.and_time(chrono::NaiveTime::MIN).and_utc())
}

async fn parse_database(config: &Database) -> ResultApp<sea_orm::DatabaseConnection> {
    let url = match config {
        Database::Memory => String::from("sqlite::memory:"),
        Database::Sqlite(path) => format!("sqlite:{}?mode=rwc", path),
    };

    let database = sea_orm::Database::connect(url).await?;
    Migrator::up(&database, None).await?;
    Ok(database)
}

fn print_trip(trip: &Trip) -> Result<(), EngineError> {
    println!("{}", serde_json::to_string_pretty(trip)?);
    Ok(())
}

/// Input mistakes end the process with a one line message; anything else is
/// returned to `main`.
fn reported(result: Result<(), EngineError>) -> ResultApp<()> {
    match result {
        Err(err) if err.is_user_error() => {
            tracing::debug!("rejected input: {err:?}");
            eprintln!("error: {err}");
            std::process::exit(2);
        }
        other => Ok(other?),
    }
}

/// Pure computation, no storage involved.
fn quick_split(args: &SplitArgs) -> Result<(), EngineError> {
    let split = QuickSplit::create(
        &args.description,
        &args.amount,
        &args.participants,
        ParticipantId::new(args.paid_by.as_str()),
        Utc::now(),
    )?;
    println!(
        "{}: {} split between {} -> {} each",
        split.description, split.total_amount, split.participant_count, split.amount_per_person
    );
    Ok(())
}

async fn run(engine: &Engine<SqlStore>, command: Command) -> Result<(), EngineError> {
    match command {
        Command::Trip(TripCmd {
            command: TripCommand::Create(args),
        }) => {
            let new_trip = NewTrip {
                name: args.name,
                description: args.description,
                start_date: args.start,
                end_date: args.end,
            };
            let trip = engine
                .create_trip(new_trip, args.identity.participant())
                .await?;
            println!("created trip: {} ({}), join code {}", trip.name, trip.id, trip.code);
        }
        Command::Trip(TripCmd {
            command: TripCommand::Join(args),
        }) => {
            let trip = engine
                .join_trip(&args.code, args.identity.participant())
                .await?;
            println!("joined trip: {} ({})", trip.name, trip.id);
        }
        Command::Trip(TripCmd {
            command: TripCommand::List,
        }) => {
            for trip in engine.trips().await? {
                println!(
                    "{}\t{}\t{}\t{} participants\t{} expenses",
                    trip.id,
                    trip.code,
                    trip.name,
                    trip.participants.len(),
                    trip.expenses.len()
                );
            }
        }
        Command::Trip(TripCmd {
            command: TripCommand::Show(TripRef { trip }),
        }) => {
            print_trip(&engine.trip(&trip).await?)?;
        }
        Command::Expense(ExpenseCmd {
            command: ExpenseCommand::Add(args),
        }) => {
            let draft = ExpenseDraft {
                description: args.description,
                amount: args.amount,
                split_between: args.split.into_iter().map(ParticipantId::from).collect(),
                category: args.category,
            };
            let expense = engine
                .add_expense(
                    &args.trip,
                    draft,
                    ParticipantId::from(args.paid_by),
                    args.date.unwrap_or_else(Utc::now),
                )
                .await?;
            println!(
                "added expense: {} ({}) {}",
                expense.description, expense.id, expense.total_amount
            );
        }
        Command::Balances(TripRef { trip }) => {
            let balances = engine.balances(&trip).await?;
            for entry in &balances {
                let sign = if entry.amount > MoneyCents::ZERO { "+" } else { "" };
                println!("{}\t{sign}{}", entry.participant, entry.amount);
            }
        }
        Command::Seed => {
            let trips = engine.seed_demo().await?;
            println!("loaded {} demo trips", trips.len());
        }
        Command::Split(args) => quick_split(&args)?,
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ResultApp<()> {
    let cli = Cli::parse();
    let settings = settings::Settings::new(cli.config.as_deref())?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "tripsplit={level},engine={level}",
            level = settings.app.level
        ))
        .with_writer(std::io::stderr)
        .init();

    if let Command::Split(args) = &cli.command {
        return reported(quick_split(args));
    }

    tracing::debug!(database = ?settings.database, "connecting");
    let db = parse_database(&settings.database).await?;
    let engine = Engine::builder().store(SqlStore::new(db)).build().await?;

    reported(run(&engine, cli.command).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_day_at_midnight_utc() {
        let day = parse_day("2024-01-15").unwrap();
        assert_eq!(day.to_rfc3339(), "2024-01-15T00:00:00+00:00");
        assert!(parse_day("15/01/2024").is_err());
    }

    #[test]
    fn cli_splits_comma_separated_participants() {
        let cli = Cli::try_parse_from([
            "tripsplit",
            "expense",
            "add",
            "--trip",
            "trip1",
            "--description",
            "Hotel",
            "--amount",
            "300",
            "--paid-by",
            "user1",
            "--split",
            "user1,user2",
        ])
        .unwrap();
        let Command::Expense(ExpenseCmd {
            command: ExpenseCommand::Add(args),
        }) = cli.command
        else {
            panic!("expected expense add");
        };
        assert_eq!(args.split, ["user1", "user2"]);
        assert_eq!(args.date, None);
    }
}
