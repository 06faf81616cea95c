//! Entities shared by the unit tests

use crate::backends::MemoryRow;
use crate::conversion::{NativeType, NativeValue};
use crate::error::ModelResult;
use crate::model::{Entity, EntityMetadata, HasMany, HasOne, JunctionTable, Record};

#[derive(Debug, Clone, PartialEq)]
pub struct Author {
    pub id: i64,
    pub name: String,
    pub books: Option<Vec<Book>>,
    pub profile: Option<Profile>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Book {
    pub id: i64,
    pub author_id: i64,
    pub title: String,
    pub in_print: bool,
    pub reviews: Option<Vec<Review>>,
    pub tags: Option<Vec<Tag>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Review {
    pub id: i64,
    pub book_id: i64,
    pub rating: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    pub id: i64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub id: i64,
    pub author_id: i64,
    pub interests: Option<Vec<Tag>>,
}

impl Author {
    pub fn new(id: i64, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            books: None,
            profile: None,
        }
    }
}

impl Entity for Author {
    fn describe() -> EntityMetadata {
        EntityMetadata::builder("Author")
            .table("authors")
            .key("id", NativeType::I64)
            .field("name", NativeType::String)
            .has_many("books", "Book", "author_id")
            .reference("profile", "Profile")
            .build()
    }

    fn from_record(record: &Record<'_>) -> ModelResult<Self> {
        Ok(Self {
            id: record.get("id")?,
            name: record.get("name")?,
            books: None,
            profile: None,
        })
    }

    fn field_value(&self, field: &str) -> Option<NativeValue> {
        match field {
            "id" => Some(self.id.into()),
            "name" => Some(self.name.clone().into()),
            _ => None,
        }
    }
}

impl Entity for Book {
    fn describe() -> EntityMetadata {
        EntityMetadata::builder("Book")
            .table("books")
            .key("id", NativeType::I64)
            .field("author_id", NativeType::I64)
            .field("title", NativeType::String)
            .field("in_print", NativeType::Bool)
            .has_many("reviews", "Review", "book_id")
            .many_to_many("tags", "Tag", JunctionTable::new("book_tags", "book_id", "tag_id"))
            .build()
    }

    fn from_record(record: &Record<'_>) -> ModelResult<Self> {
        Ok(Self {
            id: record.get("id")?,
            author_id: record.get("author_id")?,
            title: record.get("title")?,
            in_print: record.get("in_print")?,
            reviews: None,
            tags: None,
        })
    }

    fn field_value(&self, field: &str) -> Option<NativeValue> {
        match field {
            "id" => Some(self.id.into()),
            "author_id" => Some(self.author_id.into()),
            "title" => Some(self.title.clone().into()),
            "in_print" => Some(self.in_print.into()),
            _ => None,
        }
    }
}

impl Entity for Review {
    fn describe() -> EntityMetadata {
        EntityMetadata::builder("Review")
            .table("reviews")
            .key("id", NativeType::I64)
            .field("book_id", NativeType::I64)
            .field("rating", NativeType::I32)
            .build()
    }

    fn from_record(record: &Record<'_>) -> ModelResult<Self> {
        Ok(Self {
            id: record.get("id")?,
            book_id: record.get("book_id")?,
            rating: record.get("rating")?,
        })
    }

    fn field_value(&self, field: &str) -> Option<NativeValue> {
        match field {
            "id" => Some(self.id.into()),
            "book_id" => Some(self.book_id.into()),
            "rating" => Some(self.rating.into()),
            _ => None,
        }
    }
}

impl Entity for Tag {
    fn describe() -> EntityMetadata {
        EntityMetadata::builder("Tag")
            .table("tags")
            .key("id", NativeType::I64)
            .field("label", NativeType::String)
            .build()
    }

    fn from_record(record: &Record<'_>) -> ModelResult<Self> {
        Ok(Self {
            id: record.get("id")?,
            label: record.get("label")?,
        })
    }

    fn field_value(&self, field: &str) -> Option<NativeValue> {
        match field {
            "id" => Some(self.id.into()),
            "label" => Some(self.label.clone().into()),
            _ => None,
        }
    }
}

impl Entity for Profile {
    fn describe() -> EntityMetadata {
        EntityMetadata::builder("Profile")
            .table("profiles")
            .key("id", NativeType::I64)
            .field("author_id", NativeType::I64)
            .many_to_many(
                "interests",
                "Tag",
                JunctionTable::new("profile_interests", "profile_id", "tag_id"),
            )
            .build()
    }

    fn from_record(record: &Record<'_>) -> ModelResult<Self> {
        Ok(Self {
            id: record.get("id")?,
            author_id: record.get("author_id")?,
            interests: None,
        })
    }

    fn field_value(&self, field: &str) -> Option<NativeValue> {
        match field {
            "id" => Some(self.id.into()),
            "author_id" => Some(self.author_id.into()),
            _ => None,
        }
    }
}

fn books_of(author: &mut Author) -> &mut Option<Vec<Book>> {
    &mut author.books
}

fn profile_of(author: &mut Author) -> Option<&mut Profile> {
    author.profile.as_mut()
}

fn reviews_of(book: &mut Book) -> &mut Option<Vec<Review>> {
    &mut book.reviews
}

fn tags_of(book: &mut Book) -> &mut Option<Vec<Tag>> {
    &mut book.tags
}

fn interests_of(profile: &mut Profile) -> &mut Option<Vec<Tag>> {
    &mut profile.interests
}

pub fn author_books() -> HasMany<Author, Book> {
    HasMany::new("books", books_of)
}

pub fn author_profile() -> HasOne<Author, Profile> {
    HasOne::new("profile", profile_of)
}

pub fn book_reviews() -> HasMany<Book, Review> {
    HasMany::new("reviews", reviews_of)
}

pub fn book_tags() -> HasMany<Book, Tag> {
    HasMany::new("tags", tags_of)
}

pub fn profile_interests() -> HasMany<Profile, Tag> {
    HasMany::new("interests", interests_of)
}

pub fn book_row(id: i64, author_id: i64, title: &str) -> MemoryRow {
    MemoryRow::new()
        .with("id", id)
        .with("author_id", author_id)
        .with("title", title)
        .with("in_print", crate::backends::DatabaseValue::Int8(1))
}

pub fn review_row(id: i64, book_id: i64, rating: i64) -> MemoryRow {
    MemoryRow::new()
        .with("id", id)
        .with("book_id", book_id)
        .with("rating", rating)
}

pub fn tag_row(id: i64, label: &str, parent_key: i64) -> MemoryRow {
    MemoryRow::new()
        .with("id", id)
        .with("label", label)
        .with(crate::query::PARENT_KEY_ALIAS, parent_key)
}
