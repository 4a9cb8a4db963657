//! Lays out transaction reports as A4 PDF documents.
//!
//! Text uses the base-14 Helvetica fonts with WinAnsi encoding, so no font
//! data is embedded. Content streams are left uncompressed and nothing in the
//! output depends on the wall clock, which keeps rendering deterministic for
//! a given `generated_at`.

use lopdf::{
    Dictionary, Document, Object, ObjectId, Stream,
    content::{Content, Operation},
    dictionary,
};
use time::OffsetDateTime;

use crate::{
    Error,
    aggregation::AggregationResult,
    app_state::ReportConfig,
    report::{
        ReportLayout,
        format::{CurrencyFormatter, display_date, latin1, timestamp, truncate_title},
    },
    transaction::Transaction,
    user::User,
};

const PAGE_WIDTH: f32 = 595.0;
const PAGE_HEIGHT: f32 = 842.0;
const INCH: f32 = 72.0;

const HEADER_BAND_HEIGHT: f32 = 1.2 * INCH;
const TOP_MARGIN: f32 = INCH;
const BOTTOM_MARGIN: f32 = 1.5 * INCH;
const FOOTER_Y: f32 = 0.6 * INCH;

const TABLE_LEFT: f32 = 0.8 * INCH;
const TABLE_WIDTH: f32 = PAGE_WIDTH - 1.6 * INCH;
const ROW_HEIGHT: f32 = 0.35 * INCH;
const ROW_PADDING: f32 = 0.1 * INCH;

/// Left edges of the title, amount, type and date columns.
const COLUMNS: [f32; 4] = [1.0 * INCH, 2.8 * INCH, 4.0 * INCH, 5.0 * INCH];
const SUMMARY_VALUE_COLUMN: f32 = 4.0 * INCH;

const REGULAR: &str = "F1";
const BOLD: &str = "F2";
const ITALIC: &str = "F3";

type Rgb = (f32, f32, f32);

const ACCENT: Rgb = (0.2, 0.0, 0.5);
const WHITE: Rgb = (1.0, 1.0, 1.0);
const BLACK: Rgb = (0.0, 0.0, 0.0);
const GRAY: Rgb = (0.5, 0.5, 0.5);
const STRIPE: Rgb = (0.93, 0.93, 0.96);

/// Render a PDF report of `transactions` for `owner`.
pub(crate) fn render_pdf(
    owner: &User,
    transactions: &[Transaction],
    aggregation: &AggregationResult,
    layout: ReportLayout,
    generated_at: OffsetDateTime,
    config: &ReportConfig,
) -> Result<Vec<u8>, Error> {
    let currency = CurrencyFormatter::new(&config.currency_symbol)?;
    let mut pages = PageWriter::new();

    pages.fill_rect(
        0.0,
        PAGE_HEIGHT - HEADER_BAND_HEIGHT,
        PAGE_WIDTH,
        HEADER_BAND_HEIGHT,
        ACCENT,
    );
    pages.text(BOLD, 18.0, COLUMNS[0], PAGE_HEIGHT - 0.7 * INCH, WHITE, layout.title());
    pages.text(
        REGULAR,
        12.0,
        COLUMNS[0],
        PAGE_HEIGHT - 1.5 * INCH,
        BLACK,
        &format!("User: {}", owner.username),
    );
    pages.text(
        REGULAR,
        12.0,
        COLUMNS[0],
        PAGE_HEIGHT - 1.8 * INCH,
        BLACK,
        &format!("Generated: {}", timestamp(generated_at)),
    );
    pages.y = PAGE_HEIGHT - 2.4 * INCH;

    pages.heading("Summary");
    pages.header_row(&[(COLUMNS[0], "Metric"), (SUMMARY_VALUE_COLUMN, "Amount")]);
    let totals = [
        ("Total Income", aggregation.total_income),
        ("Total Expense", aggregation.total_expense),
        ("Net Balance", aggregation.net_balance),
    ];
    for (index, (label, amount)) in totals.into_iter().enumerate() {
        pages.row(
            index,
            &[
                (COLUMNS[0], label.to_owned()),
                (SUMMARY_VALUE_COLUMN, currency.format(amount)),
            ],
        );
    }

    pages.y -= ROW_HEIGHT;
    pages.heading(layout.table_heading());

    let table_header = [
        (COLUMNS[0], "Title"),
        (COLUMNS[1], "Amount"),
        (COLUMNS[2], "Type"),
        (COLUMNS[3], "Date"),
    ];
    pages.header_row(&table_header);

    if transactions.is_empty() {
        pages.row(0, &[(COLUMNS[0], "No transactions found.".to_owned())]);
    }

    for (index, transaction) in transactions.iter().enumerate() {
        if pages.y < BOTTOM_MARGIN {
            pages.new_page();
            pages.header_row(&table_header);
        }

        pages.row(
            index,
            &[
                (COLUMNS[0], truncate_title(&transaction.title)),
                (COLUMNS[1], currency.format(transaction.amount)),
                (COLUMNS[2], transaction.kind.label().to_owned()),
                (COLUMNS[3], display_date(transaction.date)),
            ],
        );
    }

    pages.finish(&config.app_name, layout.title(), generated_at)
}

/// Accumulates drawing operations page by page.
struct PageWriter {
    pages: Vec<Vec<Operation>>,
    y: f32,
}

impl PageWriter {
    fn new() -> Self {
        Self {
            pages: vec![Vec::new()],
            y: PAGE_HEIGHT - TOP_MARGIN,
        }
    }

    fn operations(&mut self) -> &mut Vec<Operation> {
        if self.pages.is_empty() {
            self.pages.push(Vec::new());
        }

        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    fn new_page(&mut self) {
        self.pages.push(Vec::new());
        self.y = PAGE_HEIGHT - TOP_MARGIN;
    }

    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, (r, g, b): Rgb) {
        self.operations().extend([
            Operation::new("q", vec![]),
            Operation::new("rg", vec![r.into(), g.into(), b.into()]),
            Operation::new("re", vec![x.into(), y.into(), width.into(), height.into()]),
            Operation::new("f", vec![]),
            Operation::new("Q", vec![]),
        ]);
    }

    fn text(&mut self, font: &str, size: f32, x: f32, y: f32, (r, g, b): Rgb, text: &str) {
        self.operations().extend([
            Operation::new("BT", vec![]),
            Operation::new("rg", vec![r.into(), g.into(), b.into()]),
            Operation::new("Tf", vec![font.into(), size.into()]),
            Operation::new("Td", vec![x.into(), y.into()]),
            Operation::new("Tj", vec![Object::string_literal(latin1(text))]),
            Operation::new("ET", vec![]),
        ]);
    }

    fn heading(&mut self, text: &str) {
        let y = self.y;
        self.text(BOLD, 14.0, COLUMNS[0], y, ACCENT, text);
        self.y -= ROW_HEIGHT;
    }

    fn header_row(&mut self, cells: &[(f32, &str)]) {
        let y = self.y;
        self.fill_rect(TABLE_LEFT, y - ROW_PADDING, TABLE_WIDTH, ROW_HEIGHT, ACCENT);

        for (x, label) in cells {
            self.text(BOLD, 11.0, *x, y, WHITE, label);
        }

        self.y -= ROW_HEIGHT;
    }

    fn row(&mut self, index: usize, cells: &[(f32, String)]) {
        let y = self.y;

        if index % 2 == 0 {
            self.fill_rect(TABLE_LEFT, y - ROW_PADDING, TABLE_WIDTH, ROW_HEIGHT, STRIPE);
        }

        for (x, value) in cells {
            self.text(REGULAR, 10.0, *x, y, BLACK, value);
        }

        self.y -= ROW_HEIGHT;
    }

    /// Add the footers and assemble the pages into a document.
    fn finish(
        mut self,
        app_name: &str,
        title: &str,
        generated_at: OffsetDateTime,
    ) -> Result<Vec<u8>, Error> {
        let page_count = self.pages.len();
        let mut document = Document::with_version("1.5");
        let pages_id = document.new_object_id();

        let font = |base_font: &str| {
            dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => base_font,
                "Encoding" => "WinAnsiEncoding",
            }
        };
        let regular_id = document.add_object(font("Helvetica"));
        let bold_id = document.add_object(font("Helvetica-Bold"));
        let italic_id = document.add_object(font("Helvetica-Oblique"));
        let resources_id = document.add_object(dictionary! {
            "Font" => dictionary! {
                REGULAR => regular_id,
                BOLD => bold_id,
                ITALIC => italic_id,
            },
        });

        let mut kids: Vec<Object> = Vec::with_capacity(page_count);

        for (index, operations) in std::mem::take(&mut self.pages).into_iter().enumerate() {
            let mut page = PageWriter {
                pages: vec![operations],
                y: FOOTER_Y,
            };
            page.text(ITALIC, 9.0, COLUMNS[0], FOOTER_Y, GRAY, &format!("Generated by {app_name}"));
            page.text(
                REGULAR,
                9.0,
                PAGE_WIDTH - 1.8 * INCH,
                FOOTER_Y,
                GRAY,
                &format!("Page {} of {page_count}", index + 1),
            );

            let content = Content {
                operations: page.pages.concat(),
            }
            .encode()
            .map_err(|error| pdf_error(error.into()))?;
            let content_id = document.add_object(Stream::new(dictionary! {}, content));
            let page_id = document.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let media_box: Vec<Object> = vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()];
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count as i64,
            "Resources" => resources_id,
            "MediaBox" => media_box,
        };
        document.objects.insert(pages_id, Object::Dictionary(pages));

        let catalog_id = document.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        let info_id = info_dictionary(&mut document, app_name, title, generated_at);
        document.trailer.set("Root", catalog_id);
        document.trailer.set("Info", info_id);

        let mut bytes = Vec::new();
        document
            .save_to(&mut bytes)
            .map_err(|error| pdf_error(error.into()))?;

        Ok(bytes)
    }
}

fn info_dictionary(
    document: &mut Document,
    app_name: &str,
    title: &str,
    generated_at: OffsetDateTime,
) -> ObjectId {
    let utc = generated_at.to_offset(time::UtcOffset::UTC);
    let creation_date = format!(
        "D:{:04}{:02}{:02}{:02}{:02}{:02}Z",
        utc.year(),
        u8::from(utc.month()),
        utc.day(),
        utc.hour(),
        utc.minute(),
        utc.second()
    );

    let info: Dictionary = dictionary! {
        "Title" => Object::string_literal(latin1(title)),
        "Producer" => Object::string_literal(latin1(app_name)),
        "CreationDate" => Object::string_literal(creation_date),
    };

    document.add_object(info)
}

fn pdf_error(error: lopdf::Error) -> Error {
    tracing::error!("could not write PDF: {error}");
    Error::ReportRenderError(error.to_string())
}
