//! Caller-owned collections of books, patrons and loan records.

use crate::error::RegistryError;
use crate::isbn;
use crate::types::{Book, BookCategory, Isbn, Patron, PatronId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Books by ISBN
///
/// Stored as a list of books; loading one re-runs [`Inventory::add`] so
/// malformed or repeated ISBNs are refused.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Book>", into = "Vec<Book>")]
pub struct Inventory {
    books: HashMap<Isbn, Book>,
}

impl Inventory {
    /// Creates an empty inventory
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a book
    ///
    /// # Errors
    ///
    /// [`RegistryError::InvalidIsbn`] when the ISBN is malformed and
    /// [`RegistryError::DuplicateBook`] when it is already registered.
    pub fn add(&mut self, book: Book) -> Result<(), RegistryError> {
        let key = book.isbn().as_str();
        if !isbn::is_valid(key) {
            return Err(RegistryError::InvalidIsbn(key.to_string()));
        }
        if self.books.contains_key(key) {
            return Err(RegistryError::DuplicateBook(key.to_string()));
        }
        self.books.insert(book.isbn().clone(), book);
        Ok(())
    }

    /// Looks up a book
    #[must_use]
    pub fn get(&self, isbn: &str) -> Option<&Book> {
        self.books.get(isbn)
    }

    /// Looks up a book for mutation
    pub fn get_mut(&mut self, isbn: &str) -> Option<&mut Book> {
        self.books.get_mut(isbn)
    }

    /// The ISBN is registered
    #[must_use]
    pub fn contains(&self, isbn: &str) -> bool {
        self.books.contains_key(isbn)
    }

    /// Number of titles
    #[must_use]
    pub fn len(&self) -> usize {
        self.books.len()
    }

    /// No titles registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    /// Iterates over all books in no particular order
    pub fn iter(&self) -> impl Iterator<Item = &Book> {
        self.books.values()
    }

    /// Counts titles in a category, optionally only those with a copy on the shelf
    ///
    /// `None` counts nothing.
    #[must_use]
    pub fn count_by_category(&self, category: Option<BookCategory>, only_available: bool) -> usize {
        let Some(category) = category else {
            return 0;
        };
        self.books
            .values()
            .filter(|book| book.category() == category)
            .filter(|book| !only_available || book.is_available())
            .count()
    }
}

impl TryFrom<Vec<Book>> for Inventory {
    type Error = RegistryError;

    fn try_from(books: Vec<Book>) -> Result<Self, Self::Error> {
        let mut inventory = Self::new();
        for book in books {
            inventory.add(book)?;
        }
        Ok(inventory)
    }
}

impl From<Inventory> for Vec<Book> {
    fn from(inventory: Inventory) -> Self {
        let mut books: Vec<Book> = inventory.books.into_values().collect();
        books.sort_by(|a, b| a.isbn().cmp(b.isbn()));
        books
    }
}

/// Patrons by identifier
///
/// Stored as a list of patrons; identifiers must be unique.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Patron>", into = "Vec<Patron>")]
pub struct PatronRegistry {
    patrons: HashMap<PatronId, Patron>,
}

impl PatronRegistry {
    /// Creates an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a patron
    ///
    /// # Errors
    ///
    /// [`RegistryError::DuplicatePatron`] when the identifier is taken.
    pub fn register(&mut self, patron: Patron) -> Result<(), RegistryError> {
        if self.patrons.contains_key(patron.id().as_str()) {
            return Err(RegistryError::DuplicatePatron(patron.id().to_string()));
        }
        self.patrons.insert(patron.id().clone(), patron);
        Ok(())
    }

    /// Looks up a patron
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Patron> {
        self.patrons.get(id)
    }

    /// Looks up a patron for mutation
    pub fn get_mut(&mut self, id: &str) -> Option<&mut Patron> {
        self.patrons.get_mut(id)
    }

    /// Number of patrons
    #[must_use]
    pub fn len(&self) -> usize {
        self.patrons.len()
    }

    /// No patrons registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patrons.is_empty()
    }

    /// Iterates over all patrons in no particular order
    pub fn iter(&self) -> impl Iterator<Item = &Patron> {
        self.patrons.values()
    }
}

impl TryFrom<Vec<Patron>> for PatronRegistry {
    type Error = RegistryError;

    fn try_from(patrons: Vec<Patron>) -> Result<Self, Self::Error> {
        let mut registry = Self::new();
        for patron in patrons {
            registry.register(patron)?;
        }
        Ok(registry)
    }
}

impl From<PatronRegistry> for Vec<Patron> {
    fn from(registry: PatronRegistry) -> Self {
        let mut patrons: Vec<Patron> = registry.patrons.into_values().collect();
        patrons.sort_by(|a, b| a.id().cmp(b.id()));
        patrons
    }
}

/// One loan, from checkout to return
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanRecord {
    /// Borrower
    pub patron_id: PatronId,
    /// Book lent
    pub isbn: Isbn,
    /// Day the book left the shelf
    pub checked_out_on: NaiveDate,
    /// Current due date (moved by renewals)
    pub due_date: NaiveDate,
    /// Day the book came back, if it has
    pub returned_on: Option<NaiveDate>,
}

impl LoanRecord {
    /// The book has not come back yet
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.returned_on.is_none()
    }
}

/// Append-only loan log
///
/// Bookkeeping only: checkout decisions never consult it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanHistory {
    records: Vec<LoanRecord>,
}

impl LoanHistory {
    /// Creates an empty history
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a new loan
    pub fn open(&mut self, patron_id: PatronId, isbn: Isbn, on: NaiveDate, due_date: NaiveDate) {
        self.records.push(LoanRecord {
            patron_id,
            isbn,
            checked_out_on: on,
            due_date,
            returned_on: None,
        });
    }

    /// Moves the due date of an open loan; false when there is none
    pub fn renew(&mut self, patron_id: &str, isbn: &str, due_date: NaiveDate) -> bool {
        match self.open_record_mut(patron_id, isbn) {
            Some(record) => {
                record.due_date = due_date;
                true
            }
            None => false,
        }
    }

    /// Closes an open loan; false when there is none
    pub fn close(&mut self, patron_id: &str, isbn: &str, on: NaiveDate) -> bool {
        match self.open_record_mut(patron_id, isbn) {
            Some(record) => {
                record.returned_on = Some(on);
                true
            }
            None => false,
        }
    }

    /// All records, oldest first
    #[must_use]
    pub fn records(&self) -> &[LoanRecord] {
        &self.records
    }

    /// Loans not yet returned
    pub fn open_loans(&self) -> impl Iterator<Item = &LoanRecord> {
        self.records.iter().filter(|record| record.is_open())
    }

    /// Every loan made to one patron, oldest first
    pub fn for_patron<'a>(&'a self, patron_id: &'a str) -> impl Iterator<Item = &'a LoanRecord> {
        self.records
            .iter()
            .filter(move |record| record.patron_id.as_str() == patron_id)
    }

    /// Number of records
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// No records
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn open_record_mut(&mut self, patron_id: &str, isbn: &str) -> Option<&mut LoanRecord> {
        self.records.iter_mut().rev().find(|record| {
            record.is_open() && record.patron_id.as_str() == patron_id && record.isbn.as_str() == isbn
        })
    }
}
