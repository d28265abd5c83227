use chrono::{DateTime, Utc};
use std::fmt;
use thiserror::Error;

use crate::model::{parse_timestamp, Article, ArticleCategory, ArticleForm, ArticleStatus};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Field {
    Title,
    Content,
    Author,
    PublishDate,
    Status,
    Category,
}

impl Field {
    pub const ALL: [Field; 6] = [
        Field::Title,
        Field::Content,
        Field::Author,
        Field::PublishDate,
        Field::Status,
        Field::Category,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Field::Title => "Title",
            Field::Content => "Content",
            Field::Author => "Author",
            Field::PublishDate => "Publish Date",
            Field::Status => "Status",
            Field::Category => "Category",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldError {
    pub field: Field,
    pub message: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Error)]
#[error("{} field(s) failed validation", .errors.len())]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn get(&self, field: Field) -> Option<&str> {
        self.errors.iter().find(|e| e.field == field).map(|e| e.message.as_str())
    }

    fn push(&mut self, field: Field, message: impl Into<String>) {
        self.errors.push(FieldError { field, message: message.into() });
    }
}

/// Form input exactly as typed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ArticleDraft {
    pub title: String,
    pub content: String,
    pub author: String,
    pub publish_date: String,
    pub status: String,
    pub category: String,
}

impl ArticleDraft {
    pub fn new_at(now: DateTime<Utc>) -> Self {
        Self {
            publish_date: now.format("%Y-%m-%dT%H:%M").to_string(),
            status: ArticleStatus::Draft.to_string(),
            category: ArticleCategory::Mining.to_string(),
            ..Default::default()
        }
    }

    pub fn from_article(a: &Article) -> Self {
        Self {
            title: a.title.clone(),
            content: a.content.clone(),
            author: a.author.clone(),
            publish_date: a.publish_date.format("%Y-%m-%dT%H:%M").to_string(),
            status: a.status.to_string(),
            category: a.category.to_string(),
        }
    }

    pub fn field(&self, field: Field) -> &str {
        match field {
            Field::Title => &self.title,
            Field::Content => &self.content,
            Field::Author => &self.author,
            Field::PublishDate => &self.publish_date,
            Field::Status => &self.status,
            Field::Category => &self.category,
        }
    }

    pub fn field_mut(&mut self, field: Field) -> &mut String {
        match field {
            Field::Title => &mut self.title,
            Field::Content => &mut self.content,
            Field::Author => &mut self.author,
            Field::PublishDate => &mut self.publish_date,
            Field::Status => &mut self.status,
            Field::Category => &mut self.category,
        }
    }
}

fn min_len(errs: &mut ValidationErrors, field: Field, value: &str, min: usize) {
    if value.chars().count() < min {
        errs.push(field, format!("{} must be at least {min} characters", field.label()));
    }
}

/// Checks every field and reports all failures at once. Only a fully valid
/// draft becomes an `ArticleForm`.
pub fn validate(draft: &ArticleDraft) -> Result<ArticleForm, ValidationErrors> {
    let mut errs = ValidationErrors::default();

    min_len(&mut errs, Field::Title, &draft.title, 5);
    min_len(&mut errs, Field::Content, &draft.content, 100);
    min_len(&mut errs, Field::Author, &draft.author, 3);

    let publish_date = if draft.publish_date.trim().is_empty() {
        errs.push(Field::PublishDate, "Please select a date and time");
        None
    } else {
        let parsed = parse_timestamp(&draft.publish_date);
        if parsed.is_none() {
            errs.push(Field::PublishDate, "That's not a valid date!");
        }
        parsed
    };

    let status = ArticleStatus::parse(draft.status.trim());
    if status.is_none() {
        errs.push(Field::Status, "Status must be one of: draft, published");
    }
    let category = ArticleCategory::parse(draft.category.trim());
    if category.is_none() {
        errs.push(Field::Category, "Category must be one of: mining, crypto");
    }

    match (publish_date, status, category) {
        (Some(publish_date), Some(status), Some(category)) if errs.errors.is_empty() => Ok(ArticleForm {
            title: draft.title.clone(),
            content: draft.content.clone(),
            author: draft.author.clone(),
            publish_date,
            status,
            category,
        }),
        _ => Err(errs),
    }
}
