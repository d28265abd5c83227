use chrono::{DateTime, Utc};

use crate::model::{Article, ArticleForm, ArticlePatch};
use crate::store::{Notice, NoticeLevel, Snapshot};
use crate::validate::{validate, ArticleDraft, Field, ValidationErrors};
use crate::view::{derive, PageView};

#[derive(Debug)]
pub struct FormState {
    /// Id of the article being edited; `None` when creating.
    pub editing: Option<String>,
    pub draft: ArticleDraft,
    pub focus: Field,
    pub errors: ValidationErrors,
    pub submitting: bool,
    /// Tags save results so one from a closed form is ignored.
    pub token: u64,
}

#[derive(Debug)]
pub enum Mode {
    Browse,
    Search,
    Form(FormState),
    ConfirmDelete(String),
}

/// What the event loop should send to the store after a valid form.
#[derive(Debug, PartialEq)]
pub enum Submission {
    Create(ArticleForm),
    Update(String, ArticlePatch),
}

#[derive(Debug)]
pub struct App {
    pub snapshot: Snapshot,
    pub page: usize,       // 1-based
    pub page_size: usize,
    pub selected: usize,   // index into the current page
    pub show_full: bool,
    pub mode: Mode,
    pub status: String,
    pub status_level: Option<NoticeLevel>,
    next_token: u64,
}

impl App {
    pub fn new(page_size: usize) -> Self {
        Self {
            snapshot: Snapshot::default(),
            page: 1,
            page_size,
            selected: 0,
            show_full: false,
            mode: Mode::Browse,
            status: "Press r to refresh. q to quit.".to_string(),
            status_level: None,
            next_token: 0,
        }
    }

    pub fn page_view(&self) -> PageView<'_> {
        derive(&self.snapshot.articles, &self.snapshot.search_query, self.page, self.page_size)
    }

    /// Takes a fresh copy of store state and re-clamps page and selection.
    pub fn refresh(&mut self, snapshot: Snapshot) {
        self.snapshot = snapshot;
        let (page, len) = {
            let view = self.page_view();
            (view.page, view.items.len())
        };
        self.page = page;
        if self.selected >= len {
            self.selected = len.saturating_sub(1);
        }
    }

    pub fn notice(&mut self, notice: Notice) {
        self.status = notice.message;
        self.status_level = Some(notice.level);
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
        self.status_level = None;
    }

    pub fn selected_article(&self) -> Option<&Article> {
        self.page_view().items.get(self.selected).copied()
    }

    pub fn move_down(&mut self) {
        let len = self.page_view().items.len();
        if len == 0 { return; }
        self.selected = (self.selected + 1).min(len - 1);
    }

    pub fn move_up(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn next_page(&mut self) {
        if self.page_view().has_next() {
            self.page += 1;
            self.selected = 0;
        }
    }

    pub fn prev_page(&mut self) {
        if self.page_view().has_prev() {
            self.page -= 1;
            self.selected = 0;
        }
    }

    /// Search restarts from the first page.
    pub fn search_changed(&mut self, snapshot: Snapshot) {
        self.page = 1;
        self.selected = 0;
        self.refresh(snapshot);
    }

    fn take_token(&mut self) -> u64 {
        self.next_token += 1;
        self.next_token
    }

    pub fn open_create(&mut self, now: DateTime<Utc>) {
        let token = self.take_token();
        self.mode = Mode::Form(FormState {
            editing: None,
            draft: ArticleDraft::new_at(now),
            focus: Field::Title,
            errors: ValidationErrors::default(),
            submitting: false,
            token,
        });
    }

    pub fn open_edit(&mut self) {
        let Some((id, draft)) = self.selected_article().map(|a| (a.id.clone(), ArticleDraft::from_article(a))) else {
            return;
        };
        let form = FormState {
            editing: Some(id),
            draft,
            focus: Field::Title,
            errors: ValidationErrors::default(),
            submitting: false,
            token: self.take_token(),
        };
        self.mode = Mode::Form(form);
    }

    pub fn ask_delete(&mut self) {
        if let Some(id) = self.selected_article().map(|a| a.id.clone()) {
            self.mode = Mode::ConfirmDelete(id);
        }
    }

    pub fn form_mut(&mut self) -> Option<&mut FormState> {
        match &mut self.mode {
            Mode::Form(form) if !form.submitting => Some(form),
            _ => None,
        }
    }

    pub fn form_input(&mut self, c: char) {
        if let Some(form) = self.form_mut() {
            form.draft.field_mut(form.focus).push(c);
        }
    }

    pub fn form_backspace(&mut self) {
        if let Some(form) = self.form_mut() {
            form.draft.field_mut(form.focus).pop();
        }
    }

    pub fn form_focus(&mut self, step: isize) {
        if let Some(form) = self.form_mut() {
            let n = Field::ALL.len() as isize;
            let pos = Field::ALL.iter().position(|f| *f == form.focus).unwrap_or(0) as isize;
            form.focus = Field::ALL[(pos + step).rem_euclid(n) as usize];
        }
    }

    /// Validates the open form. Returns the form's token and what to submit,
    /// or keeps the form open with its field errors.
    pub fn submit_form(&mut self) -> Option<(u64, Submission)> {
        let form = self.form_mut()?;
        match validate(&form.draft) {
            Ok(valid) => {
                form.errors = ValidationErrors::default();
                form.submitting = true;
                let submission = match &form.editing {
                    Some(id) => Submission::Update(id.clone(), ArticlePatch::from(valid)),
                    None => Submission::Create(valid),
                };
                let token = form.token;
                self.set_status("Saving…");
                Some((token, submission))
            }
            Err(errs) => {
                let count = errs.errors.len();
                form.errors = errs;
                self.set_status(format!("{count} field(s) need attention"));
                None
            }
        }
    }

    /// Closes the form after a successful save; a failed save re-enables it.
    /// Results for any form other than the open one are dropped.
    pub fn form_saved(&mut self, token: u64, ok: bool) {
        if !matches!(&self.mode, Mode::Form(form) if form.token == token) { return; }
        if ok {
            self.mode = Mode::Browse;
        } else if let Mode::Form(form) = &mut self.mode {
            form.submitting = false;
        }
    }

    pub fn cancel(&mut self) {
        self.mode = Mode::Browse;
    }
}
