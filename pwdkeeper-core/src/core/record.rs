//! Record model: the four record variants and the enums they share.
//!
//! A [`Record`] is one of [`Category`], [`Card`], [`Note`] or [`Link`]. All of
//! them carry an immutable, non-empty `id` and a `modified` timestamp in epoch
//! milliseconds. Only categories own children; links reference another record
//! by id and never own it.
//!
//! The string forms of [`FieldType`], [`Picture`] and [`RecordKind`] are the
//! names written into the document file and must not change.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::core::error::KeeperError;

/// Generates a fresh, globally unique record id.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Current wall-clock time in epoch milliseconds, the unit of `modified`.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Declares a document-facing enum with its wire names, `FromStr` and `Display`.
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $what:literal { $($variant:ident => $wire:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $wire)]
                $variant,
            )+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// The name written into the document file.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire,)+
                }
            }
        }

        impl FromStr for $name {
            type Err = KeeperError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($wire => Ok($name::$variant),)+
                    other => Err(KeeperError::MalformedDocument(format!(
                        "unknown {} '{}'",
                        $what, other
                    ))),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

wire_enum! {
    /// How a card field is displayed and copied. Never affects storage.
    FieldType, "field type" {
        String => "STRING",
        Hidden => "HIDDEN",
        Email => "EMAIL",
        Link => "LINK",
        CreditCardNumber => "CREDIT_CARD_NUMBER",
    }
}

impl FieldType {
    /// Hidden fields are masked on screen until revealed.
    #[must_use]
    pub fn is_masked(&self) -> bool {
        matches!(self, FieldType::Hidden)
    }
}

wire_enum! {
    /// Display icon of a record.
    Picture, "picture" {
        Generic => "GENERIC",
        Password => "PASSWORD",
        Info => "INFO",
        Important => "IMPORTANT",
        Auto => "AUTO",
        Airplane => "AIRPLANE",
        Train => "TRAIN",
        Amex => "AMEX",
        Mastercard => "MASTERCARD",
        Internet => "INTERNET",
        Insurance => "INSURANCE",
        Glasses => "GLASSES",
        Bank => "BANK",
        Raif => "RAIF",
        Email => "EMAIL",
        Visa => "VISA",
        CreditCard => "CREDIT_CARD",
        Iphone => "IPHONE",
        Mobile => "MOBILE",
        Wifi => "WIFI",
        Cd => "CD",
        Computer => "COMPUTER",
        Facebook => "FACEBOOK",
        Vk => "VK",
        Skype => "SKYPE",
        Twitter => "TWITTER",
        Gplus => "GPLUS",
        Mozilla => "MOZILLA",
        Passport => "PASSPORT",
        Shop => "SHOP",
        Note => "NOTE",
        Medicine => "MEDICINE",
        House => "HOUSE",
        Female => "FEMALE",
        Male => "MALE",
        Education => "EDUCATION",
        Steam => "STEAM",
        Folder => "FOLDER",
    }
}

wire_enum! {
    /// Closed catalogue of record templates.
    ///
    /// A kind seeds the field list and picture of newly created cards and is
    /// remembered by categories as the default for cards created inside them.
    RecordKind, "record kind" {
        Empty => "EMPTY",
        CreditCard => "CREDIT_CARD",
        Car => "CAR",
        Glasses => "GLASSES",
        Passport => "PASSPORT",
        Email => "EMAIL",
        Password => "PASSWORD",
    }
}

impl RecordKind {
    /// Icon given to new cards of this kind.
    #[must_use]
    pub fn default_picture(&self) -> Picture {
        match self {
            RecordKind::Empty | RecordKind::Password => Picture::Generic,
            RecordKind::CreditCard => Picture::CreditCard,
            RecordKind::Car => Picture::Auto,
            RecordKind::Glasses => Picture::Glasses,
            RecordKind::Passport => Picture::Passport,
            RecordKind::Email => Picture::Email,
        }
    }

    /// Field template for new cards of this kind, all values empty.
    #[must_use]
    pub fn template_fields(&self) -> Vec<Field> {
        use FieldType::*;
        let template: &[(FieldType, &str)] = match self {
            RecordKind::Empty => &[],
            RecordKind::CreditCard => &[
                (String, "Card Provider"),
                (String, "Credit Card Type"),
                (CreditCardNumber, "Card Number"),
                (String, "Expiration Date"),
                (Hidden, "PIN"),
                (String, "Name on Card"),
                (String, "Phone Number"),
                (Hidden, "CVC#"),
                (String, "User Name"),
                (Hidden, "Password"),
            ],
            RecordKind::Car => &[
                (String, "Title"),
                (String, "VIN"),
                (String, "Passport"),
                (String, "Registration"),
                (String, "Engine"),
                (String, "Body"),
                (String, "Plate"),
            ],
            RecordKind::Glasses => &[
                (String, "Right (O.D.) SPH"),
                (String, "Right CYL"),
                (Hidden, "Right AXIS"),
                (String, "Left (O.S.) SPH"),
                (String, "Left CYL"),
                (String, "Left AXIS"),
                (String, "Pupil Distance (mm)"),
                (String, "Doctor's Name"),
                (String, "Doctor's Phone #"),
                (String, "Other Information"),
            ],
            RecordKind::Passport => &[
                (String, "Title"),
                (String, "Number"),
                (String, "Issued"),
                (String, "Valid Until"),
                (String, "Issuer"),
            ],
            RecordKind::Email => &[
                (String, "System"),
                (Email, "E-Mail Address"),
                (String, "User Name"),
                (Hidden, "Password"),
                (String, "IMAP"),
                (String, "IMAP Port"),
                (String, "SMTP"),
                (String, "SMTP Port"),
            ],
            RecordKind::Password => &[
                (String, "System"),
                (String, "User Name"),
                (Hidden, "Password"),
                (Link, "URL"),
            ],
        };
        template
            .iter()
            .map(|(field_type, name)| Field::new(*field_type, *name, ""))
            .collect()
    }
}

/// A typed name/value pair on a [`Card`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub name: String,
    pub value: String,
}

impl Field {
    pub fn new(field_type: FieldType, name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field_type,
            name: name.into(),
            value: value.into(),
        }
    }

    /// Value placed on the clipboard: card numbers lose their spaces.
    #[must_use]
    pub fn clipboard_value(&self) -> String {
        match self.field_type {
            FieldType::CreditCardNumber => self.value.chars().filter(|c| *c != ' ').collect(),
            _ => self.value.clone(),
        }
    }

    /// Value shown on screen: masked fields never reveal content or length.
    #[must_use]
    pub fn display_value(&self) -> String {
        if self.field_type.is_masked() && !self.value.is_empty() {
            "******".to_string()
        } else {
            self.value.clone()
        }
    }
}

/// A folder. Only categories own children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub modified: i64,
    pub name: String,
    pub kind: RecordKind,
    pub picture: Picture,
    pub expanded: bool,
}

impl Category {
    pub fn new(name: impl Into<String>, kind: RecordKind, picture: Picture) -> Self {
        Self {
            id: new_id(),
            modified: now_millis(),
            name: name.into(),
            kind,
            picture,
            expanded: false,
        }
    }
}

/// A password entry: ordered fields plus a free-text note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: String,
    pub modified: i64,
    pub name: String,
    pub kind: RecordKind,
    pub picture: Picture,
    pub fields: Vec<Field>,
    pub note: String,
}

impl Card {
    pub fn new(
        name: impl Into<String>,
        kind: RecordKind,
        picture: Picture,
        fields: Vec<Field>,
        note: impl Into<String>,
    ) -> Self {
        Self {
            id: new_id(),
            modified: now_millis(),
            name: name.into(),
            kind,
            picture,
            fields,
            note: note.into(),
        }
    }

    /// Creates an empty card seeded from `kind`'s template and default picture.
    pub fn from_kind(name: impl Into<String>, kind: RecordKind) -> Self {
        Self::new(name, kind, kind.default_picture(), kind.template_fields(), "")
    }
}

/// A free-text note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub modified: i64,
    pub name: String,
    pub text: String,
}

impl Note {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            modified: now_millis(),
            name: name.into(),
            text: text.into(),
        }
    }
}

/// A reference to another record, by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    pub id: String,
    pub modified: i64,
    pub target_id: String,
}

impl Link {
    pub fn new(target_id: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            modified: now_millis(),
            target_id: target_id.into(),
        }
    }
}

/// One node of the record tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "recordType")]
pub enum Record {
    Category(Category),
    Card(Card),
    Note(Note),
    Link(Link),
}

impl Record {
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Record::Category(c) => &c.id,
            Record::Card(c) => &c.id,
            Record::Note(n) => &n.id,
            Record::Link(l) => &l.id,
        }
    }

    #[must_use]
    pub fn modified(&self) -> i64 {
        match self {
            Record::Category(c) => c.modified,
            Record::Card(c) => c.modified,
            Record::Note(n) => n.modified,
            Record::Link(l) => l.modified,
        }
    }

    /// Display name. Links have none of their own.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Record::Category(c) => &c.name,
            Record::Card(c) => &c.name,
            Record::Note(n) => &n.name,
            Record::Link(_) => "",
        }
    }

    #[must_use]
    pub fn kind(&self) -> RecordKind {
        match self {
            Record::Category(c) => c.kind,
            Record::Card(c) => c.kind,
            Record::Note(_) | Record::Link(_) => RecordKind::Empty,
        }
    }

    #[must_use]
    pub fn picture(&self) -> Picture {
        match self {
            Record::Category(c) => c.picture,
            Record::Card(c) => c.picture,
            Record::Note(_) => Picture::Note,
            Record::Link(_) => Picture::Folder,
        }
    }

    /// Element name of this variant in the document file.
    #[must_use]
    pub fn tag(&self) -> &'static str {
        match self {
            Record::Category(_) => "Category",
            Record::Card(_) => "Card",
            Record::Note(_) => "Note",
            Record::Link(_) => "Link",
        }
    }

    #[must_use]
    pub fn is_category(&self) -> bool {
        matches!(self, Record::Category(_))
    }

    #[must_use]
    pub fn is_link(&self) -> bool {
        matches!(self, Record::Link(_))
    }

    /// Returns a value-identical copy carrying a freshly generated id.
    #[must_use]
    pub fn clone_with_new_id(&self) -> Record {
        let mut copy = self.clone();
        copy.set_id(new_id());
        copy
    }

    /// Refreshes `modified` to the current time.
    pub fn touch(&mut self) {
        let now = now_millis();
        match self {
            Record::Category(c) => c.modified = now,
            Record::Card(c) => c.modified = now,
            Record::Note(n) => n.modified = now,
            Record::Link(l) => l.modified = now,
        }
    }

    pub(crate) fn set_id(&mut self, id: String) {
        match self {
            Record::Category(c) => c.id = id,
            Record::Card(c) => c.id = id,
            Record::Note(n) => n.id = id,
            Record::Link(l) => l.id = id,
        }
    }

    /// True when both records are the same variant.
    pub(crate) fn same_variant(&self, other: &Record) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

impl From<Category> for Record {
    fn from(c: Category) -> Self {
        Record::Category(c)
    }
}

impl From<Card> for Record {
    fn from(c: Card) -> Self {
        Record::Card(c)
    }
}

impl From<Note> for Record {
    fn from(n: Note) -> Self {
        Record::Note(n)
    }
}

impl From<Link> for Record {
    fn from(l: Link) -> Self {
        Record::Link(l)
    }
}
