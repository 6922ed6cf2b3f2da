//! Circulation desk demo
//!
//! Registers a small catalogue and a few patrons, then walks through the
//! interesting checkout paths and prints the result codes.

use library_checkout::metrics::register_library_metrics;
use library_checkout::{
    BookCategory, CirculationDesk, LibraryAction, LibraryConfig, Money, Outcome, PatronCategory,
    calculate_fine, eligibility, isbn,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const TEXTBOOK: &str = "978-0-1234-5678-9";
const NOVEL: &str = "0123456789";
const ATLAS: &str = "978-0-9999-8888-7";
const PICTURE_BOOK: &str = "978-1-1111-2222-3";

const STUDENT: &str = "P-10001";
const FACULTY: &str = "P-20001";
const CHILD: &str = "P-30001";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = LibraryConfig::try_from_env()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.log_filter))
        .with(tracing_subscriber::fmt::layer())
        .init();

    register_library_metrics();

    println!("=== Library Circulation Desk ===\n");

    let desk = CirculationDesk::from_config(&config);

    stock_shelves(&desk).await?;
    register_patrons(&desk).await?;

    println!(">>> Student borrows a textbook");
    checkout(&desk, TEXTBOOK, STUDENT).await?;

    println!("\n>>> Faculty tries to borrow the reference atlas");
    checkout(&desk, ATLAS, FACULTY).await?;

    println!("\n>>> Student is charged $12.50 and tries a novel");
    desk
        .send(LibraryAction::ChargeFine {
            patron_id: STUDENT.into(),
            amount: Money::from_cents(1_250),
        })
        .await?;
    checkout(&desk, NOVEL, STUDENT).await?;

    println!("\n>>> Child account is suspended and tries a picture book");
    desk
        .send(LibraryAction::SetSuspended {
            patron_id: CHILD.into(),
            suspended: true,
        })
        .await?;
    checkout(&desk, PICTURE_BOOK, CHILD).await?;

    println!("\n>>> Eligibility");
    for id in [STUDENT, FACULTY, CHILD] {
        let code = desk.state(|s| eligibility::validate(s.patron(id))).await;
        println!("  {id}: {code}");
    }

    println!("\n>>> Fine schedule");
    for (days, category) in [
        (5, BookCategory::Fiction),
        (10, BookCategory::Nonfiction),
        (20, BookCategory::Textbook),
        (50, BookCategory::Fiction),
    ] {
        println!("  {days:>2} days, {category}: {}", calculate_fine(days, category));
    }

    println!("\n>>> ISBN checks");
    for candidate in [TEXTBOOK, "123456789X", "978-INVALID"] {
        println!("  {candidate}: {}", isbn::is_valid(candidate));
    }

    println!("\n>>> Student returns the textbook");
    print_outcome(&Outcome::Return(desk.return_book(TEXTBOOK, STUDENT).await?));

    println!("\n>>> Returning it a second time");
    print_outcome(&Outcome::Return(desk.return_book(TEXTBOOK, STUDENT).await?));

    println!("\n>>> Student loan history");
    let loans = desk
        .state(|s| {
            s.history
                .for_patron(STUDENT)
                .map(|loan| {
                    let returned = loan
                        .returned_on
                        .map_or_else(|| "open".to_string(), |on| format!("returned {on}"));
                    format!("{} due {} ({returned})", loan.isbn, loan.due_date)
                })
                .collect::<Vec<_>>()
        })
        .await;
    for loan in loans {
        println!("  {loan}");
    }

    let (titles, on_shelf, loans) = desk
        .state(|s| {
            (
                s.inventory.len(),
                s.inventory.count_by_category(None, true),
                s.history.len(),
            )
        })
        .await;
    println!("\n{titles} titles on file, {on_shelf} with copies on the shelf, {loans} loans recorded");

    desk.shutdown().await?;
    println!("\n=== Desk closed ===");
    Ok(())
}

async fn stock_shelves(desk: &CirculationDesk) -> Result<(), Box<dyn std::error::Error>> {
    let catalogue = [
        (TEXTBOOK, "Introduction to Algorithms", "Cormen", BookCategory::Textbook, 3),
        (NOVEL, "The Great Adventure", "Jane Doe", BookCategory::Fiction, 5),
        (ATLAS, "World Atlas", "Geographic Society", BookCategory::Reference, 1),
        (PICTURE_BOOK, "The Little Fox", "Sam Green", BookCategory::Children, 10),
    ];

    for (isbn, title, author, category, total_copies) in catalogue {
        desk
            .send(LibraryAction::AddBook {
                isbn: isbn.into(),
                title: title.into(),
                author: author.into(),
                category,
                total_copies,
            })
            .await?;
    }
    Ok(())
}

async fn register_patrons(desk: &CirculationDesk) -> Result<(), Box<dyn std::error::Error>> {
    let patrons = [
        (STUDENT, "Alice Johnson", "alice@university.edu", PatronCategory::Student),
        (FACULTY, "Dr. Robert Smith", "rsmith@university.edu", PatronCategory::Faculty),
        (CHILD, "Emily Brown", "emily.parent@email.com", PatronCategory::Child),
    ];

    for (patron_id, name, email, category) in patrons {
        desk
            .send(LibraryAction::RegisterPatron {
                patron_id: patron_id.into(),
                name: name.into(),
                email: email.into(),
                category,
            })
            .await?;
    }
    Ok(())
}

async fn checkout(desk: &CirculationDesk, isbn: &str, patron_id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let code = desk.checkout(isbn, patron_id).await?;
    print_outcome(&Outcome::Checkout(code));
    Ok(())
}

fn print_outcome(outcome: &Outcome) {
    println!("  result: {:.1} ({outcome:?})", outcome.as_f64());
}
