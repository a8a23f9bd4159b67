//! HTML rendering for the browser front end.
//!
//! Pages are plain handlebars templates embedded in the binary. Each page has
//! a serializable view model built from a [`Session`]; the templates never see
//! the session itself.

use crate::downloader::export_file_name;
use crate::review::{self, Summary};
use crate::session::{APPROVAL_COLUMN, Approval, Session};
use handlebars::{Handlebars, RenderError, TemplateError};
use serde::Serialize;

/// Guidance shown under every decode failure
pub const UPLOAD_HINT: &str = "Please make sure the file is a valid Excel file (.xlsx or .xls)";

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    Info,
    Success,
    Warning,
    Error,
}

/// A one-off message shown on the next render
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

impl Notice {
    pub fn info(text: impl Into<String>) -> Self {
        Notice {
            kind: NoticeKind::Info,
            text: text.into(),
        }
    }

    pub fn success(text: impl Into<String>) -> Self {
        Notice {
            kind: NoticeKind::Success,
            text: text.into(),
        }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Notice {
            kind: NoticeKind::Warning,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Notice {
            kind: NoticeKind::Error,
            text: text.into(),
        }
    }
}

#[derive(Serialize, Debug)]
pub struct UploadPage {
    pub notices: Vec<Notice>,
    pub hint: Option<&'static str>,
    /// A previous session is still available
    pub has_session: bool,
}

impl UploadPage {
    pub fn new(has_session: bool) -> Self {
        UploadPage {
            notices: Vec::new(),
            hint: None,
            has_session,
        }
    }

    pub fn with_error(has_session: bool, error: impl Into<String>) -> Self {
        UploadPage {
            notices: vec![Notice::error(error)],
            hint: Some(UPLOAD_HINT),
            has_session,
        }
    }
}

#[derive(Serialize, Debug)]
pub struct SheetOption {
    pub name: String,
    pub selected: bool,
}

#[derive(Serialize, Debug)]
pub struct Field {
    pub name: String,
    pub value: String,
}

/// Everything the review page shows for the current cursor position
#[derive(Serialize, Debug)]
pub struct ReviewPage {
    pub file_name: String,
    pub export_name: String,
    pub sheet: String,
    pub sheets: Vec<SheetOption>,
    pub show_sheet_selector: bool,
    pub notices: Vec<Notice>,
    pub empty: bool,
    /// 1-based
    pub row_number: usize,
    pub row_count: usize,
    pub progress: String,
    pub progress_value: f64,
    pub can_go_back: bool,
    pub can_go_forward: bool,
    pub fields: Vec<Field>,
    pub approved: bool,
    pub summary: Summary,
}

impl ReviewPage {
    /// Build the page for the session's current row
    ///
    /// # Arguments
    /// * `session` - The session being reviewed
    /// * `file_name` - Name of the uploaded file
    /// * `sheet` - Sheet the session was decoded from
    /// * `sheet_names` - All sheets in the workbook
    /// * `notices` - Messages queued since the last render
    pub fn build(
        session: &Session,
        file_name: &str,
        sheet: &str,
        sheet_names: &[String],
        mut notices: Vec<Notice>,
    ) -> Self {
        let nav = review::navigation(session);
        let progress_value = review::progress(session).unwrap_or(0.0);

        if session.is_empty() {
            notices.push(Notice::warning("The selected sheet is empty."));
        }

        let fields = session
            .working()
            .named_cells(session.cursor())
            .filter(|(name, _)| *name != APPROVAL_COLUMN)
            .map(|(name, value)| Field {
                name: name.to_string(),
                value: value.to_string(),
            })
            .collect();

        ReviewPage {
            file_name: file_name.to_string(),
            export_name: export_file_name(file_name),
            sheet: sheet.to_string(),
            sheets: sheet_names
                .iter()
                .map(|name| SheetOption {
                    name: name.clone(),
                    selected: name == sheet,
                })
                .collect(),
            show_sheet_selector: sheet_names.len() > 1,
            notices,
            empty: session.is_empty(),
            row_number: nav.position + 1,
            row_count: nav.row_count,
            progress: format_progress(progress_value),
            progress_value,
            can_go_back: nav.can_go_back,
            can_go_forward: nav.can_go_forward,
            fields,
            approved: review::current_approval(session).ok() == Some(Approval::Yes),
            summary: review::summary(session),
        }
    }
}

/// The whole working table
#[derive(Serialize, Debug)]
pub struct PreviewPage {
    pub file_name: String,
    pub sheet: String,
    pub columns: Vec<String>,
    pub rows: Vec<PreviewRow>,
}

#[derive(Serialize, Debug)]
pub struct PreviewRow {
    pub number: usize,
    pub current: bool,
    pub cells: Vec<String>,
}

impl PreviewPage {
    pub fn build(session: &Session, file_name: &str, sheet: &str) -> Self {
        let table = session.working();
        PreviewPage {
            file_name: file_name.to_string(),
            sheet: sheet.to_string(),
            columns: table.columns().to_vec(),
            rows: table
                .rows()
                .iter()
                .enumerate()
                .map(|(i, record)| PreviewRow {
                    number: i + 1,
                    current: i == session.cursor(),
                    cells: record.values().iter().map(ToString::to_string).collect(),
                })
                .collect(),
        }
    }
}

/// Percentage with one decimal, e.g. `33.3%`
pub fn format_progress(value: f64) -> String {
    format!("{:.1}%", value * 100.0)
}

/// Template registry for the web pages
pub struct Renderer {
    registry: Handlebars<'static>,
}

impl Renderer {
    pub fn new() -> Result<Self, TemplateError> {
        let mut registry = Handlebars::new();
        registry.register_partial("head", include_str!("./static/head.hbs"))?;
        registry.register_partial("notices", include_str!("./static/notices.hbs"))?;
        registry.register_template_string("upload", include_str!("./static/upload.hbs"))?;
        registry.register_template_string("review", include_str!("./static/review.hbs"))?;
        registry.register_template_string("preview", include_str!("./static/preview.hbs"))?;
        Ok(Renderer { registry })
    }

    pub fn upload(&self, page: &UploadPage) -> Result<String, RenderError> {
        self.registry.render("upload", page)
    }

    pub fn review(&self, page: &ReviewPage) -> Result<String, RenderError> {
        self.registry.render("review", page)
    }

    pub fn preview(&self, page: &PreviewPage) -> Result<String, RenderError> {
        self.registry.render("preview", page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{CellValue, Table};

    fn session() -> Session {
        Session::load(
            Table::new(
                vec!["name".into(), "city".into()],
                vec![
                    vec![CellValue::text("Ada"), CellValue::text("London")],
                    vec![CellValue::text("Grace <3"), CellValue::text("Arlington")],
                ],
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_review_page_model() {
        let session = session();
        let page = ReviewPage::build(
            &session,
            "people.xlsx",
            "Sheet1",
            &["Sheet1".to_string(), "Other".to_string()],
            vec![],
        );
        assert_eq!(page.row_number, 1);
        assert_eq!(page.row_count, 2);
        assert_eq!(page.progress, "50.0%");
        assert!(!page.can_go_back);
        assert!(page.can_go_forward);
        assert!(!page.approved);
        assert_eq!(page.export_name, "updated_people.xlsx");
        assert!(page.show_sheet_selector);
        assert!(page.sheets[0].selected && !page.sheets[1].selected);
        // The approval column is shown as a choice, not as a field
        let names: Vec<_> = page.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["name", "city"]);
    }

    #[test]
    fn test_empty_sheet_warns() {
        let session = Session::load(Table::new(vec!["a".into()], vec![]).unwrap());
        let page = ReviewPage::build(&session, "e.xlsx", "Sheet1", &["Sheet1".to_string()], vec![]);
        assert!(page.empty);
        assert!(page.notices.iter().any(|n| n.kind == NoticeKind::Warning));
    }

    #[test]
    fn test_templates_render_and_escape() {
        let renderer = Renderer::new().unwrap();
        let mut session = session();
        review::last(&mut session);
        let page = ReviewPage::build(&session, "people.xlsx", "Sheet1", &["Sheet1".to_string()], vec![]);
        let html = renderer.review(&page).unwrap();
        assert!(html.contains("Row 2 of 2"));
        assert!(html.contains("Grace &lt;3"));
        assert!(!html.contains("Grace <3"));

        let preview = renderer
            .preview(&PreviewPage::build(&session, "people.xlsx", "Sheet1"))
            .unwrap();
        assert!(preview.contains("Arlington"));

        let upload = renderer
            .upload(&UploadPage::with_error(false, "Invalid spreadsheet"))
            .unwrap();
        assert!(upload.contains("Invalid spreadsheet"));
        assert!(upload.contains(UPLOAD_HINT));
    }

    #[test]
    fn test_format_progress() {
        assert_eq!(format_progress(1.0 / 3.0), "33.3%");
        assert_eq!(format_progress(1.0), "100.0%");
    }
}
