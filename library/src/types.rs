//! Domain types for library circulation.
//!
//! Books and patrons carry the counters and maps the checkout engine reads
//! and mutates. Their mutating operations are bounded (copy counts never
//! leave `0..=total`, fine balances never go negative) and the ones that
//! change loan state are crate-private: only the decision engine and the
//! return processor move books in and out of a patron's hands.

use crate::error::RegistryError;
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Borrow;
use std::collections::HashMap;
use std::convert::Infallible;
use std::str::FromStr;
use uuid::Uuid;

/// Correlates a checkout or return command with the event that answers it
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Creates a new random `RequestId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a `RequestId` from a UUID
    #[must_use]
    pub const fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Book identifier (ISBN as registered, hyphens included)
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Isbn(String);

impl Isbn {
    /// Wraps an ISBN string without validating it
    ///
    /// Syntax checks happen at registration, see [`crate::isbn::is_valid`].
    #[must_use]
    pub fn new(isbn: impl Into<String>) -> Self {
        Self(isbn.into())
    }

    /// Returns the ISBN text
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Isbn {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Isbn {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Isbn {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for Isbn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Patron identifier (e.g. `P-10001`)
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PatronId(String);

impl PatronId {
    /// Creates a patron identifier
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier text
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for PatronId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PatronId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for PatronId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for PatronId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Book category
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookCategory {
    /// Fiction
    Fiction,
    /// Nonfiction
    Nonfiction,
    /// Reference-only, never circulates
    Reference,
    /// Textbook
    Textbook,
    /// Children's books
    Children,
}

impl BookCategory {
    /// Every category, in declaration order
    pub const ALL: [Self; 5] = [
        Self::Fiction,
        Self::Nonfiction,
        Self::Reference,
        Self::Textbook,
        Self::Children,
    ];

    /// Reference books are permanently non-circulating
    #[must_use]
    pub const fn is_reference_only(self) -> bool {
        matches!(self, Self::Reference)
    }

    /// Categories whose overdue fines accrue at double rate
    #[must_use]
    pub const fn doubles_fines(self) -> bool {
        matches!(self, Self::Reference | Self::Textbook)
    }
}

impl std::fmt::Display for BookCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Fiction => "FICTION",
            Self::Nonfiction => "NONFICTION",
            Self::Reference => "REFERENCE",
            Self::Textbook => "TEXTBOOK",
            Self::Children => "CHILDREN",
        };
        f.write_str(label)
    }
}

/// Patron category, which fixes checkout limit and loan period
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PatronCategory {
    /// Faculty member
    Faculty,
    /// Staff member
    Staff,
    /// Enrolled student
    Student,
    /// Member of the public; also the fallback for unrecognized labels
    #[default]
    Public,
    /// Child account
    Child,
}

impl PatronCategory {
    /// Every category, in declaration order
    pub const ALL: [Self; 5] = [
        Self::Faculty,
        Self::Staff,
        Self::Student,
        Self::Public,
        Self::Child,
    ];

    /// Maximum number of books held at once
    #[must_use]
    pub const fn max_checkouts(self) -> usize {
        match self {
            Self::Faculty => 20,
            Self::Staff => 15,
            Self::Student => 10,
            Self::Public => 5,
            Self::Child => 3,
        }
    }

    /// Days from checkout (or renewal) to due date
    #[must_use]
    pub const fn loan_period_days(self) -> u64 {
        match self {
            Self::Faculty => 60,
            Self::Staff => 45,
            Self::Student => 30,
            Self::Public => 21,
            Self::Child => 14,
        }
    }

    /// Parses a category label, falling back to [`PatronCategory::Public`]
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_uppercase().as_str() {
            "FACULTY" => Self::Faculty,
            "STAFF" => Self::Staff,
            "STUDENT" => Self::Student,
            "CHILD" => Self::Child,
            _ => Self::Public,
        }
    }

    /// True when `label` names exactly this category (`"STUDENT"`, ...)
    #[must_use]
    pub fn is_labelled(self, label: &str) -> bool {
        label == self.to_string()
    }
}

impl FromStr for PatronCategory {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_label(s))
    }
}

impl std::fmt::Display for PatronCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Faculty => "FACULTY",
            Self::Staff => "STAFF",
            Self::Student => "STUDENT",
            Self::Public => "PUBLIC",
            Self::Child => "CHILD",
        };
        f.write_str(label)
    }
}

/// Money amount in cents (avoids floating point issues)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(u64);

impl Money {
    /// Zero dollars
    pub const ZERO: Self = Self(0);

    /// Creates a new `Money` amount from cents
    #[must_use]
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// Creates a `Money` amount from whole dollars
    #[must_use]
    pub const fn from_dollars(dollars: u64) -> Self {
        Self(dollars.saturating_mul(100))
    }

    /// Returns the amount in cents
    #[must_use]
    pub const fn cents(self) -> u64 {
        self.0
    }

    /// Returns the amount in dollars as a float, for numeric interop
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // fine balances are far below 2^52 cents
    pub fn as_dollars(self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Checks if this amount is zero
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Adds, saturating at `u64::MAX` cents
    #[must_use]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    /// Subtracts, flooring at zero
    #[must_use]
    pub const fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "${}.{:02}", self.0 / 100, self.0 % 100)
    }
}

/// Result of a checkout attempt
///
/// A closed set of outcomes, each with a fixed numeric code used by existing
/// test suites and other bindings. [`CheckoutCode::as_f64`] returns the code;
/// serialization emits it as a bare number.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CheckoutCode {
    /// 0.0 - checked out, no warning (also "eligible" from the validator)
    Success,
    /// 0.1 - patron already held the book; due date extended
    Renewed,
    /// 1.0 - checked out; patron has one or two overdue books
    OverdueWarning,
    /// 1.1 - checked out; patron is now within two of their limit
    NearLimitWarning,
    /// 2.0 - no copies available
    Unavailable,
    /// 2.1 - no such book
    BookMissing,
    /// 3.0 - patron account suspended
    PatronSuspended,
    /// 3.1 - no such patron
    PatronMissing,
    /// 3.2 - patron already holds their maximum
    CheckoutLimitReached,
    /// 4.0 - patron has three or more overdue books
    TooManyOverdue,
    /// 4.1 - patron owes $10.00 or more
    UnpaidFines,
    /// 5.0 - reference-only book
    ReferenceOnly,
}

impl CheckoutCode {
    /// Every code, in ascending numeric order
    pub const ALL: [Self; 12] = [
        Self::Success,
        Self::Renewed,
        Self::OverdueWarning,
        Self::NearLimitWarning,
        Self::Unavailable,
        Self::BookMissing,
        Self::PatronSuspended,
        Self::PatronMissing,
        Self::CheckoutLimitReached,
        Self::TooManyOverdue,
        Self::UnpaidFines,
        Self::ReferenceOnly,
    ];

    /// The numeric interop code
    #[must_use]
    pub const fn as_f64(self) -> f64 {
        match self {
            Self::Success => 0.0,
            Self::Renewed => 0.1,
            Self::OverdueWarning => 1.0,
            Self::NearLimitWarning => 1.1,
            Self::Unavailable => 2.0,
            Self::BookMissing => 2.1,
            Self::PatronSuspended => 3.0,
            Self::PatronMissing => 3.1,
            Self::CheckoutLimitReached => 3.2,
            Self::TooManyOverdue => 4.0,
            Self::UnpaidFines => 4.1,
            Self::ReferenceOnly => 5.0,
        }
    }

    /// Looks up the code for a numeric value (tolerates float noise)
    #[must_use]
    pub fn from_f64(value: f64) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|code| (code.as_f64() - value).abs() < 1e-9)
    }

    /// Short label for logs and metric tags
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Renewed => "renewed",
            Self::OverdueWarning => "overdue_warning",
            Self::NearLimitWarning => "near_limit_warning",
            Self::Unavailable => "unavailable",
            Self::BookMissing => "book_missing",
            Self::PatronSuspended => "patron_suspended",
            Self::PatronMissing => "patron_missing",
            Self::CheckoutLimitReached => "checkout_limit_reached",
            Self::TooManyOverdue => "too_many_overdue",
            Self::UnpaidFines => "unpaid_fines",
            Self::ReferenceOnly => "reference_only",
        }
    }

    /// The checkout went through (plain, renewal, or with a warning)
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(
            self,
            Self::Success | Self::Renewed | Self::OverdueWarning | Self::NearLimitWarning
        )
    }

    /// The checkout went through with a cautionary warning
    #[must_use]
    pub const fn is_warning(self) -> bool {
        matches!(self, Self::OverdueWarning | Self::NearLimitWarning)
    }

    /// The checkout was refused and nothing changed
    #[must_use]
    pub const fn is_rejection(self) -> bool {
        !self.is_success()
    }
}

impl std::fmt::Display for CheckoutCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.1}", self.as_f64())
    }
}

impl Serialize for CheckoutCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_f64())
    }
}

impl<'de> Deserialize<'de> for CheckoutCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Self::from_f64(value)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown checkout code {value}")))
    }
}

/// A book title held by the library, with its copy counters
///
/// Deserialization goes through [`Book::new`], so stored copy counts are
/// clamped the same way [`Book::set_available_copies`] clamps them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BookRecord")]
pub struct Book {
    isbn: Isbn,
    title: String,
    author: String,
    category: BookCategory,
    total_copies: u32,
    available_copies: u32,
}

impl Book {
    /// Creates a book with every copy on the shelf
    ///
    /// Reference books start (and stay) at zero available copies whatever
    /// `total_copies` says.
    #[must_use]
    pub fn new(
        isbn: impl Into<Isbn>,
        title: impl Into<String>,
        author: impl Into<String>,
        category: BookCategory,
        total_copies: u32,
    ) -> Self {
        let available_copies = if category.is_reference_only() {
            0
        } else {
            total_copies
        };

        Self {
            isbn: isbn.into(),
            title: title.into(),
            author: author.into(),
            category,
            total_copies,
            available_copies,
        }
    }

    /// ISBN
    #[must_use]
    pub const fn isbn(&self) -> &Isbn {
        &self.isbn
    }

    /// Title
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Author
    #[must_use]
    pub fn author(&self) -> &str {
        &self.author
    }

    /// Category
    #[must_use]
    pub const fn category(&self) -> BookCategory {
        self.category
    }

    /// Copies owned by the library
    #[must_use]
    pub const fn total_copies(&self) -> u32 {
        self.total_copies
    }

    /// Copies currently on the shelf
    #[must_use]
    pub const fn available_copies(&self) -> u32 {
        self.available_copies
    }

    /// At least one copy is on the shelf
    #[must_use]
    pub const fn is_available(&self) -> bool {
        self.available_copies > 0
    }

    /// Reference-only (never circulates)
    #[must_use]
    pub const fn is_reference_only(&self) -> bool {
        self.category.is_reference_only()
    }

    /// Overrides the shelf count, e.g. after a stock take
    ///
    /// Clamped to `0..=total_copies`; always 0 for reference books.
    pub fn set_available_copies(&mut self, copies: u32) {
        self.available_copies = if self.is_reference_only() {
            0
        } else {
            copies.min(self.total_copies)
        };
    }

    /// Puts every copy back on the shelf (none for reference books)
    pub fn reset_availability(&mut self) {
        self.set_available_copies(self.total_copies);
    }

    /// Takes one copy off the shelf; false when none is left
    pub(crate) fn lend_copy(&mut self) -> bool {
        if self.available_copies == 0 {
            return false;
        }
        self.available_copies -= 1;
        true
    }

    /// Puts one copy back, never exceeding the total
    pub(crate) fn restore_copy(&mut self) {
        if !self.is_reference_only() && self.available_copies < self.total_copies {
            self.available_copies += 1;
        }
    }
}

/// Wire shape of a [`Book`]
#[derive(Deserialize)]
struct BookRecord {
    isbn: Isbn,
    title: String,
    author: String,
    category: BookCategory,
    total_copies: u32,
    available_copies: u32,
}

impl From<BookRecord> for Book {
    fn from(record: BookRecord) -> Self {
        let mut book = Self::new(
            record.isbn,
            record.title,
            record.author,
            record.category,
            record.total_copies,
        );
        book.set_available_copies(record.available_copies);
        book
    }
}

impl std::fmt::Display for Book {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} \"{}\" by {} ({}, {}/{} available)",
            self.isbn,
            self.title,
            self.author,
            self.category,
            self.available_copies,
            self.total_copies
        )
    }
}

/// A library member and their loan state
///
/// `overdue_count` is an externally maintained signal (set by whatever
/// process audits loans). It is not derived from the due dates in
/// `checked_out`.
///
/// Deserialization refuses a patron holding more books than the category
/// limit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PatronRecord")]
pub struct Patron {
    id: PatronId,
    name: String,
    email: String,
    category: PatronCategory,
    suspended: bool,
    fine_balance: Money,
    checked_out: HashMap<Isbn, NaiveDate>,
    overdue_count: u32,
    member_since: NaiveDate,
}

impl Patron {
    /// Creates an active patron with no loans and no fines
    #[must_use]
    pub fn new(
        id: impl Into<PatronId>,
        name: impl Into<String>,
        email: impl Into<String>,
        category: PatronCategory,
        member_since: NaiveDate,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            email: email.into(),
            category,
            suspended: false,
            fine_balance: Money::ZERO,
            checked_out: HashMap::new(),
            overdue_count: 0,
            member_since,
        }
    }

    /// Identifier
    #[must_use]
    pub const fn id(&self) -> &PatronId {
        &self.id
    }

    /// Full name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Contact email
    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Category
    #[must_use]
    pub const fn category(&self) -> PatronCategory {
        self.category
    }

    /// Date the account was opened
    #[must_use]
    pub const fn member_since(&self) -> NaiveDate {
        self.member_since
    }

    /// Account is suspended
    #[must_use]
    pub const fn is_suspended(&self) -> bool {
        self.suspended
    }

    /// Unpaid fines
    #[must_use]
    pub const fn fine_balance(&self) -> Money {
        self.fine_balance
    }

    /// Number of overdue books as last reported
    #[must_use]
    pub const fn overdue_count(&self) -> u32 {
        self.overdue_count
    }

    /// Books currently held, with due dates
    #[must_use]
    pub const fn checked_out_books(&self) -> &HashMap<Isbn, NaiveDate> {
        &self.checked_out
    }

    /// Number of books currently held (renewals do not add to this)
    #[must_use]
    pub fn checkout_count(&self) -> usize {
        self.checked_out.len()
    }

    /// The patron currently holds `isbn`
    #[must_use]
    pub fn holds(&self, isbn: &str) -> bool {
        self.checked_out.contains_key(isbn)
    }

    /// Due date for a held book
    #[must_use]
    pub fn due_date(&self, isbn: &str) -> Option<NaiveDate> {
        self.checked_out.get(isbn).copied()
    }

    /// Category limit on simultaneous checkouts
    #[must_use]
    pub const fn max_checkouts(&self) -> usize {
        self.category.max_checkouts()
    }

    /// Category loan period in days
    #[must_use]
    pub const fn loan_period_days(&self) -> u64 {
        self.category.loan_period_days()
    }

    /// Suspends or reinstates the account
    pub fn set_suspended(&mut self, suspended: bool) {
        self.suspended = suspended;
    }

    /// Records the externally computed overdue-book count
    pub fn set_overdue_count(&mut self, count: u32) {
        self.overdue_count = count;
    }

    /// Adds a charge to the fine balance; zero charges are ignored
    pub fn add_fine(&mut self, amount: Money) {
        if !amount.is_zero() {
            self.fine_balance = self.fine_balance.saturating_add(amount);
        }
    }

    /// Applies a payment and returns the remaining balance (never negative)
    pub fn pay_fine(&mut self, amount: Money) -> Money {
        self.fine_balance = self.fine_balance.saturating_sub(amount);
        self.fine_balance
    }

    /// Clears the fine balance
    pub fn reset_fines(&mut self) {
        self.fine_balance = Money::ZERO;
    }

    /// Starts a loan, or moves the due date of one already held
    pub(crate) fn record_loan(&mut self, isbn: Isbn, due: NaiveDate) {
        self.checked_out.insert(isbn, due);
    }

    /// Ends a loan, returning its due date
    pub(crate) fn release_loan(&mut self, isbn: &str) -> Option<NaiveDate> {
        self.checked_out.remove(isbn)
    }
}

/// Wire shape of a [`Patron`]
#[derive(Deserialize)]
struct PatronRecord {
    id: PatronId,
    name: String,
    email: String,
    category: PatronCategory,
    suspended: bool,
    fine_balance: Money,
    checked_out: HashMap<Isbn, NaiveDate>,
    overdue_count: u32,
    member_since: NaiveDate,
}

impl TryFrom<PatronRecord> for Patron {
    type Error = RegistryError;

    fn try_from(record: PatronRecord) -> Result<Self, Self::Error> {
        let max = record.category.max_checkouts();
        if record.checked_out.len() > max {
            return Err(RegistryError::LoanLimitExceeded {
                patron_id: record.id.to_string(),
                held: record.checked_out.len(),
                max,
            });
        }

        let mut patron = Self::new(
            record.id,
            record.name,
            record.email,
            record.category,
            record.member_since,
        );
        patron.set_suspended(record.suspended);
        patron.set_overdue_count(record.overdue_count);
        patron.add_fine(record.fine_balance);
        patron.checked_out = record.checked_out;
        Ok(patron)
    }
}

impl std::fmt::Display for Patron {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}-{}({})[Books:{}/{},Fines:{}]",
            self.id,
            self.name,
            self.category,
            self.checked_out.len(),
            self.max_checkouts(),
            self.fine_balance
        )
    }
}
