// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod console;

use anyhow::{Context, Result, anyhow, bail};
use arenda_api::Client;
use arenda_app::{
    Apartment, ApartmentField, ApartmentId, ApartmentSort, Booking, BookingComposer,
    BookingDecision, BookingField, BookingId, BookingOutcome, BookingSort, BookingStatus,
    CollectionKey, CollectionView, FieldKey, FieldValue, Listable, ListController, ListingStatus,
    LoadState, PriceBucket, Profile, ProfileField, RecordView, RecordWriter, RequestedMarkers,
    RoomCount, SortDirection, SubmitOutcome, SubmitRejected, apartment_schema,
    conflicting_bookings, fetch_all, parse_choice, parse_date, profile_schema, review_booking,
};
use clap::{CommandFactory, Parser, Subcommand};
use config::Config;
use console::{ConsoleNotifier, apartment_detail, apartment_table, booking_table, profile_detail};
use std::path::PathBuf;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "ARENDA_LOG";
const DEFAULT_LOG_FILTER: &str = "warn,arenda_app=info,arenda_api=info";

#[derive(Debug, Parser)]
#[command(name = "arenda")]
#[command(about = "Browse, edit and book rental apartments from the terminal")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Use a specific config file
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Print the resolved config path and exit
    #[arg(long)]
    print_config_path: bool,

    /// Print a v1 config template and exit
    #[arg(long)]
    print_example_config: bool,

    /// Validate config and API settings without contacting the server
    #[arg(long)]
    check: bool,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Search apartment listings
    Search {
        /// Text matched against title, address and description
        query: Vec<String>,
        /// Price bucket: all, under-100k, 100k-200k, 200k-300k, over-300k
        #[arg(long, default_value = "all")]
        price: String,
        /// Room count: all, 1, 2, 3, 4+
        #[arg(long, default_value = "all")]
        rooms: String,
        /// Listing status: all, active, rented, archived
        #[arg(long, default_value = "all")]
        status: String,
        /// Sort by price, rooms, area, created, title or district
        #[arg(long)]
        sort: Option<String>,
        /// Sort descending
        #[arg(long)]
        desc: bool,
        #[arg(long, default_value = "1")]
        page: usize,
    },
    /// List apartments owned by the configured user
    Mine {
        #[arg(long, default_value = "1")]
        page: usize,
    },
    /// Show one apartment
    Show { id: i64 },
    /// Change fields of an apartment
    Edit {
        id: i64,
        /// FIELD=VALUE, repeatable
        #[arg(long = "set", value_name = "FIELD=VALUE", required = true)]
        assignments: Vec<String>,
    },
    /// Show or change the configured user's profile
    Profile {
        /// FIELD=VALUE, repeatable
        #[arg(long = "set", value_name = "FIELD=VALUE")]
        assignments: Vec<String>,
    },
    /// Request a booking for an apartment
    Book {
        apartment: i64,
        /// Move-in date (YYYY-MM-DD)
        #[arg(long)]
        from: String,
        /// Move-out date (YYYY-MM-DD)
        #[arg(long)]
        to: String,
        /// Note for the owner
        #[arg(long)]
        message: Option<String>,
    },
    /// List bookings made by the configured user, or those of one apartment
    Bookings {
        /// Show requests for this apartment instead of your own
        #[arg(long)]
        apartment: Option<i64>,
        /// Booking status: all, pending, approved, rejected, cancelled
        #[arg(long, default_value = "all")]
        status: String,
        /// Sort by start, created or status
        #[arg(long)]
        sort: Option<String>,
        #[arg(long)]
        desc: bool,
        #[arg(long, default_value = "1")]
        page: usize,
    },
    /// Approve or reject a pending booking
    Review {
        booking: i64,
        /// approve or reject
        decision: String,
    },
}

fn main() {
    init_tracing();
    if let Err(error) = run(Cli::parse()) {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn run(cli: Cli) -> Result<()> {
    let config_path = match cli.config {
        Some(path) => path,
        None => Config::default_path()?,
    };

    if cli.print_config_path {
        println!("{}", config_path.display());
        return Ok(());
    }

    if cli.print_example_config {
        print!("{}", Config::example_config(&config_path));
        return Ok(());
    }

    let config = Config::load(&config_path).with_context(|| {
        format!(
            "load config {}; run `arenda --print-example-config` to generate a v1 template",
            config_path.display()
        )
    })?;

    let mut client = Client::new(&config.api_base_url(), config.api_timeout()?)
        .with_context(|| {
            format!(
                "invalid [api] config in {}; fix base_url/timeout values",
                config_path.display()
            )
        })?;
    debug!(base_url = client.base_url(), "api client ready");

    if cli.check {
        println!("config ok; api at {}", client.base_url());
        return Ok(());
    }

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let mut notifier = ConsoleNotifier::default();
    match command {
        Commands::Search {
            query,
            price,
            rooms,
            status,
            sort,
            desc,
            page,
        } => {
            let mut controller = ListController::<Apartment>::with_page_size(config.page_size());
            controller.set_search(&query.join(" "));
            let price =
                parse_choice(&price, PriceBucket::parse).map_err(|e| anyhow!("--price: {e}"))?;
            let rooms =
                parse_choice(&rooms, RoomCount::parse).map_err(|e| anyhow!("--rooms: {e}"))?;
            let status =
                parse_choice(&status, ListingStatus::parse).map_err(|e| anyhow!("--status: {e}"))?;
            controller.update_filter(|filter| {
                filter.price = price;
                filter.rooms = rooms;
                filter.status = status;
            });
            apply_sort(&mut controller, sort.as_deref(), desc, ApartmentSort::parse)?;
            controller.set_page(page);

            let view =
                load_collection(&mut client, controller, &CollectionKey::All, &mut notifier)?;
            let markers = tenant_markers(&mut client, &config);
            print!("{}", apartment_table(&view.view(), &markers));
        }
        Commands::Mine { page } => {
            let owner = config.user_id()?;
            let mut controller = ListController::<Apartment>::with_page_size(config.page_size());
            controller.set_page(page);
            let view =
                load_collection(&mut client, controller, &CollectionKey::Owner(owner), &mut notifier)?;
            print!("{}", apartment_table(&view.view(), &RequestedMarkers::new()));
        }
        Commands::Show { id } => {
            let view = load_record::<Apartment>(&mut client, "apartment", id, &mut notifier)?;
            if let Some(apartment) = view.store().view() {
                print!("{}", apartment_detail(apartment));
            }
        }
        Commands::Edit { id, assignments } => {
            let mut view = load_record::<Apartment>(&mut client, "apartment", id, &mut notifier)?;
            let changes = parse_assignments::<ApartmentField>(&assignments)?;
            save_record(&mut view, &mut client, changes, &mut notifier)?;
            if let Some(apartment) = view.store().view() {
                print!("{}", apartment_detail(apartment));
            }
        }
        Commands::Profile { assignments } => {
            let user = config.user_id()?;
            let mut view = load_record::<Profile>(&mut client, "profile", user.get(), &mut notifier)?;
            if !assignments.is_empty() {
                let changes = parse_assignments::<ProfileField>(&assignments)?;
                save_record(&mut view, &mut client, changes, &mut notifier)?;
            }
            if let Some(profile) = view.store().view() {
                print!("{}", profile_detail(profile));
            }
        }
        Commands::Book {
            apartment,
            from,
            to,
            message,
        } => {
            let start = parse_date(&from).map_err(|e| anyhow!("--from: {e}"))?;
            let end = parse_date(&to).map_err(|e| anyhow!("--to: {e}"))?;
            let mut composer = BookingComposer::new();
            composer.start(ApartmentId::new(apartment), start, end);
            if let Some(message) = message {
                composer.update_field(BookingField::Message, FieldValue::Text(message));
            }
            match composer.submit(&mut client, &mut notifier) {
                BookingOutcome::Requested(booking) => {
                    println!("booking #{} is {}", booking.id, booking.status.as_str());
                }
                BookingOutcome::Failed(_) => {
                    bail!("booking request for apartment {apartment} was not sent")
                }
                BookingOutcome::Rejected(SubmitRejected::Invalid(report)) => {
                    bail!("booking request is invalid: {}", report.summary())
                }
                BookingOutcome::Rejected(rejected) => {
                    bail!("booking request was not submitted: {rejected:?}")
                }
                BookingOutcome::Stale => {}
            }
        }
        Commands::Bookings {
            apartment,
            status,
            sort,
            desc,
            page,
        } => {
            let key = match apartment {
                Some(id) => CollectionKey::Apartment(ApartmentId::new(id)),
                None => CollectionKey::Tenant(config.user_id()?),
            };
            let mut controller = ListController::<Booking>::with_page_size(config.page_size());
            let status =
                parse_choice(&status, BookingStatus::parse).map_err(|e| anyhow!("--status: {e}"))?;
            controller.update_filter(|filter| filter.status = status);
            apply_sort(&mut controller, sort.as_deref(), desc, BookingSort::parse)?;
            controller.set_page(page);

            let view = load_collection(&mut client, controller, &key, &mut notifier)?;
            let conflicts = conflicting_bookings(view.items());
            print!("{}", booking_table(&view.view(), &conflicts));
            if !conflicts.is_empty() {
                println!(
                    "{} pending request(s) overlap an approved booking",
                    conflicts.len()
                );
            }
        }
        Commands::Review { booking, decision } => {
            let decision = BookingDecision::parse(&decision)
                .ok_or_else(|| anyhow!("unknown decision {decision:?}; use approve or reject"))?;
            review_booking(&mut client, BookingId::new(booking), decision, &mut notifier)
                .map_err(|error| anyhow!("review of booking {booking} failed: {error}"))?;
        }
    }

    if notifier.had_errors() {
        bail!("finished with errors");
    }
    Ok(())
}

fn apply_sort<T: Listable>(
    controller: &mut ListController<T>,
    raw: Option<&str>,
    descending: bool,
    parse: impl Fn(&str) -> Option<T::SortField>,
) -> Result<()> {
    let Some(raw) = raw else {
        return Ok(());
    };
    let field = parse(raw).ok_or_else(|| anyhow!("unknown sort field {raw:?}"))?;
    let direction = if descending {
        SortDirection::Desc
    } else {
        SortDirection::Asc
    };
    controller.set_sort(field, direction);
    Ok(())
}

fn load_collection<T>(
    client: &mut Client,
    controller: ListController<T>,
    key: &CollectionKey,
    notifier: &mut ConsoleNotifier,
) -> Result<CollectionView<T>>
where
    T: Listable,
    Client: arenda_app::CollectionSource<T>,
{
    let mut view = CollectionView::new(controller);
    view.reload(client, key, notifier);
    ensure_loaded(view.state())?;
    Ok(view)
}

fn load_record<T>(
    client: &mut Client,
    label: &'static str,
    id: i64,
    notifier: &mut ConsoleNotifier,
) -> Result<RecordView<T>>
where
    T: RecordSchema,
    Client: arenda_app::RecordSource<T>,
{
    let mut view = RecordView::new(label, T::schema());
    view.load(client, id, notifier);
    ensure_loaded(view.state())?;
    Ok(view)
}

fn ensure_loaded(state: &LoadState) -> Result<()> {
    match state {
        LoadState::Failed {
            message,
            retryable: true,
        } => bail!("{message}"),
        LoadState::Failed { message, .. } => bail!("{message} -- check the id and retry"),
        LoadState::Idle | LoadState::Loading | LoadState::Ready => Ok(()),
    }
}

fn save_record<T>(
    view: &mut RecordView<T>,
    client: &mut Client,
    changes: Vec<(T::Field, FieldValue)>,
    notifier: &mut ConsoleNotifier,
) -> Result<()>
where
    T: arenda_app::Editable,
    Client: RecordWriter<T>,
{
    let Some(record) = view.store().record() else {
        bail!("nothing loaded to edit");
    };
    check_assignments(record, &changes)?;
    view.start_editing();
    for (field, value) in changes {
        if !view.update_field(field, value) {
            bail!("could not set {}", field.name());
        }
    }
    match view.submit(client, notifier) {
        SubmitOutcome::Saved | SubmitOutcome::Stale => Ok(()),
        SubmitOutcome::Rejected(SubmitRejected::NoChanges) => Ok(()),
        SubmitOutcome::Rejected(SubmitRejected::Invalid(report)) => {
            bail!("changes not saved: {}", report.summary())
        }
        SubmitOutcome::Rejected(rejected) => bail!("changes not saved: {rejected:?}"),
        SubmitOutcome::Failed(error) => bail!("changes not saved: {error}"),
    }
}

/// Apartments the configured user already asked to book. Empty when no
/// user is configured or the lookup fails.
fn tenant_markers(client: &mut Client, config: &Config) -> RequestedMarkers {
    let mut markers = RequestedMarkers::new();
    let Ok(tenant) = config.user_id() else {
        return markers;
    };
    match fetch_all::<Booking, _>(client, &CollectionKey::Tenant(tenant)) {
        Ok(bookings) => markers.reconcile(&bookings, tenant),
        Err(error) => warn!(%error, "could not load booking markers"),
    }
    markers
}

trait RecordSchema: arenda_app::Editable {
    fn schema() -> arenda_app::Schema<Self::Field>;
}

impl RecordSchema for Apartment {
    fn schema() -> arenda_app::Schema<ApartmentField> {
        apartment_schema()
    }
}

impl RecordSchema for Profile {
    fn schema() -> arenda_app::Schema<ProfileField> {
        profile_schema()
    }
}

/// Applies `changes` to a scratch copy so a bad value fails before editing starts.
fn check_assignments<T: arenda_app::Editable>(
    record: &T,
    changes: &[(T::Field, FieldValue)],
) -> Result<()> {
    let mut scratch = record.clone();
    for (field, value) in changes {
        scratch
            .set_field(*field, value.clone())
            .with_context(|| format!("cannot set {}", field.name()))?;
    }
    Ok(())
}

fn parse_assignments<F: FieldKey>(raw: &[String]) -> Result<Vec<(F, FieldValue)>> {
    raw.iter().map(|item| parse_assignment(item)).collect()
}

fn parse_assignment<F: FieldKey>(raw: &str) -> Result<(F, FieldValue)> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("expected FIELD=VALUE, got {raw:?}"))?;
    let field = F::parse(name).ok_or_else(|| {
        let known: Vec<&str> = F::ALL.iter().map(|field| field.name()).collect();
        anyhow!(
            "unknown field {:?}; expected one of {}",
            name.trim(),
            known.join(", ")
        )
    })?;
    let value = field.parse_value(value)?;
    Ok((field, value))
}

#[cfg(test)]
mod tests {
    use super::{Cli, Commands, check_assignments, parse_assignment};
    use arenda_app::{ApartmentField, ApartmentId, FieldValue, ProfileField, UserId};
    use arenda_testkit::ListingFaker;
    use clap::Parser;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    #[test]
    fn global_flags_parse_without_subcommand() {
        let cli = Cli::try_parse_from(["arenda", "--config", "/tmp/arenda.toml", "--check"])
            .expect("parse");
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/arenda.toml")));
        assert!(cli.check);
        assert!(cli.command.is_none());
    }

    #[test]
    fn search_defaults_to_all_filters() {
        let cli = Cli::try_parse_from(["arenda", "search", "almaty", "medeu"]).expect("parse");
        match cli.command {
            Some(Commands::Search {
                query,
                price,
                rooms,
                status,
                sort,
                desc,
                page,
            }) => {
                assert_eq!(query, vec!["almaty", "medeu"]);
                assert_eq!((price.as_str(), rooms.as_str(), status.as_str()), ("all", "all", "all"));
                assert_eq!(sort, None);
                assert!(!desc);
                assert_eq!(page, 1);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn edit_requires_at_least_one_assignment() {
        assert!(Cli::try_parse_from(["arenda", "edit", "4"]).is_err());
        let cli = Cli::try_parse_from([
            "arenda",
            "edit",
            "4",
            "--set",
            "title=Sunny loft",
            "--set",
            "price_per_month=180000",
        ])
        .expect("parse");
        match cli.command {
            Some(Commands::Edit { id, assignments }) => {
                assert_eq!(id, 4);
                assert_eq!(assignments.len(), 2);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn book_takes_dates_as_flags() {
        let cli = Cli::try_parse_from([
            "arenda", "book", "7", "--from", "2025-06-01", "--to", "2025-06-15",
        ])
        .expect("parse");
        assert!(matches!(
            cli.command,
            Some(Commands::Book { apartment: 7, message: None, .. })
        ));
    }

    #[test]
    fn assignment_parses_typed_value() {
        let (field, value) =
            parse_assignment::<ApartmentField>("price_per_month=180000").expect("assignment");
        assert_eq!(field, ApartmentField::PricePerMonth);
        assert_eq!(value, FieldValue::Integer(180_000));
    }

    #[test]
    fn assignment_field_names_are_case_insensitive() {
        let (field, _) = parse_assignment::<ProfileField>("EMAIL=aigerim@example.kz")
            .expect("assignment");
        assert_eq!(field, ProfileField::Email);
    }

    #[test]
    fn assignment_without_equals_is_rejected() {
        let error = parse_assignment::<ApartmentField>("title").expect_err("missing =");
        assert!(error.to_string().contains("FIELD=VALUE"));
    }

    #[test]
    fn unknown_field_lists_known_names() {
        let error = parse_assignment::<ApartmentField>("colour=red").expect_err("unknown");
        let message = error.to_string();
        assert!(message.contains("colour"));
        assert!(message.contains("price_per_month"));
    }

    #[test]
    fn bad_value_names_the_field() {
        let error = parse_assignment::<ApartmentField>("rooms=many").expect_err("bad value");
        assert!(error.to_string().contains("rooms"));
    }

    #[test]
    fn unknown_status_is_refused_before_saving() {
        let apartment = ListingFaker::new(3).apartment(ApartmentId::new(2), UserId::new(1));
        let change = parse_assignment::<ApartmentField>("status=sold").expect("parses as text");
        let error = check_assignments(&apartment, &[change]).expect_err("sold is not a status");
        let message = format!("{error:#}");
        assert!(message.contains("cannot set status"));
        assert!(message.contains("sold"));
    }

    #[test]
    fn valid_assignments_pass_the_check() {
        let apartment = ListingFaker::new(3).apartment(ApartmentId::new(2), UserId::new(1));
        let changes = vec![
            parse_assignment::<ApartmentField>("status=rented").expect("status"),
            parse_assignment::<ApartmentField>("rooms=4").expect("rooms"),
        ];
        assert!(check_assignments(&apartment, &changes).is_ok());
    }
}
