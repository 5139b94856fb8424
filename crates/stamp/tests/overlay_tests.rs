//! End-to-end stamping tests

use lopdf::{dictionary, Object};
use pretty_assertions::assert_eq;
use stamp::{
    generate_qr_png, overlay_qr_on_pdf, QrOptions, StampError, StampLayout, StampReport,
    VERIFICATION_TEXT,
};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Write a PDF with one page per `(width, height)` entry, each carrying
/// `/Rotate rotate`
fn write_test_pdf(path: &Path, sizes: &[(i64, i64)], rotate: i64) {
    let mut doc = lopdf::Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let kids: Vec<Object> = sizes
        .iter()
        .map(|&(w, h)| {
            let contents_id = doc.add_object(lopdf::Stream::new(
                dictionary! {},
                b"0 0 1 rg 10 10 50 50 re f".to_vec(),
            ));
            doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), w.into(), h.into()],
                "Rotate" => rotate,
                "Contents" => contents_id,
            })
            .into()
        })
        .collect();

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => sizes.len() as i64,
            "Kids" => kids,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    doc.save(path).unwrap();
}

struct Fixture {
    dir: TempDir,
    input: PathBuf,
    output: PathBuf,
    qr_png: PathBuf,
}

fn fixture(sizes: &[(i64, i64)]) -> Fixture {
    rotated_fixture(sizes, 0)
}

fn rotated_fixture(sizes: &[(i64, i64)], rotate: i64) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("report.pdf");
    let output = dir.path().join("report_stamped.pdf");
    write_test_pdf(&input, sizes, rotate);
    let qr_png = generate_qr_png(VERIFICATION_TEXT, &QrOptions::default(), dir.path()).unwrap();

    Fixture {
        dir,
        input,
        output,
        qr_png,
    }
}

fn page_content(doc: &lopdf::Document, page: u32) -> String {
    let page_id = doc.get_pages()[&page];
    let page_dict = doc.get_object(page_id).unwrap().as_dict().unwrap();

    let mut out = Vec::new();
    for obj in page_dict.get(b"Contents").unwrap().as_array().unwrap() {
        let stream = doc
            .get_object(obj.as_reference().unwrap())
            .unwrap()
            .as_stream()
            .unwrap();
        let data = stream
            .decompressed_content()
            .unwrap_or_else(|_| stream.content.clone());
        out.extend_from_slice(&data);
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[test]
fn test_stamps_every_page() {
    let f = fixture(&[(612, 792), (595, 842), (842, 595)]);
    let layout = StampLayout::default().with_qr_size(110.0);

    let report = overlay_qr_on_pdf(&f.input, &f.output, &f.qr_png, &layout).unwrap();
    assert_eq!(
        report,
        StampReport {
            pages: 3,
            labelled_pages: 3
        }
    );

    let doc = lopdf::Document::load(&f.output).unwrap();
    assert_eq!(doc.get_pages().len(), 3);

    for page in 1..=3 {
        let content = page_content(&doc, page);
        assert!(content.contains("Do"), "page {page} has no image");
        assert!(content.contains("(To Verify) Tj"), "page {page} has no caption");
        // original drawing is kept
        assert!(content.contains("10 10 50 50 re f"));
    }
}

/// Numbers of the first line of `content` ending in `operator`
fn operands(content: &str, operator: &str) -> Vec<f64> {
    let suffix = format!(" {operator}");
    content
        .lines()
        .find(|line| line.ends_with(&suffix))
        .unwrap_or_else(|| panic!("no {operator} in {content}"))
        .split_whitespace()
        .filter_map(|v| v.parse().ok())
        .collect()
}

fn assert_close(actual: &[f64], expected: &[f64]) {
    assert_eq!(actual.len(), expected.len(), "{actual:?}");
    for (a, e) in actual.iter().zip(expected) {
        assert!((a - e).abs() < 1e-6, "{actual:?} != {expected:?}");
    }
}

#[test]
fn test_qr_placed_bottom_right() {
    let f = fixture(&[(612, 792)]);
    let layout = StampLayout::default().with_qr_size(110.0);
    overlay_qr_on_pdf(&f.input, &f.output, &f.qr_png, &layout).unwrap();

    let doc = lopdf::Document::load(&f.output).unwrap();
    let content = page_content(&doc, 1);

    // Top-left box (478, 658)-(588, 768) is (478, 24) in PDF space
    assert_close(
        &operands(&content, "cm"),
        &[110.0, 0.0, 0.0, 110.0, 478.0, 24.0],
    );
}

#[test]
fn test_qr_placed_bottom_right_on_rotated_page() {
    // Portrait MediaBox shown as landscape 792 x 612
    let f = rotated_fixture(&[(612, 792)], 90);
    let layout = StampLayout::default().with_qr_size(110.0);

    let report = overlay_qr_on_pdf(&f.input, &f.output, &f.qr_png, &layout).unwrap();
    assert_eq!(report.labelled_pages, 1);

    let doc = lopdf::Document::load(&f.output).unwrap();
    let content = page_content(&doc, 1);

    // Displayed box (658, 478)-(768, 588); its displayed bottom-left
    // (658, 588) is user (588, 658), image axes turned a quarter turn
    assert_close(
        &operands(&content, "cm"),
        &[0.0, 110.0, -110.0, 0.0, 588.0, 658.0],
    );

    // Caption box (658, 594)-(768, 606): centred start x 692.995 and
    // baseline 604.75 from the top, mapped to user (604.75, 692.995)
    assert_close(
        &operands(&content, "Tm"),
        &[0.0, 1.0, -1.0, 0.0, 604.75, 692.995],
    );
    assert!(content.contains("(To Verify) Tj"));
}

#[test]
fn test_qr_png_deleted_after_success() {
    let f = fixture(&[(612, 792)]);
    assert!(f.qr_png.exists());

    overlay_qr_on_pdf(&f.input, &f.output, &f.qr_png, &StampLayout::default()).unwrap();
    assert!(!f.qr_png.exists());
}

#[test]
fn test_qr_png_deleted_after_failure() {
    let f = fixture(&[(612, 792)]);
    std::fs::write(&f.input, b"this is not a pdf").unwrap();

    let result = overlay_qr_on_pdf(&f.input, &f.output, &f.qr_png, &StampLayout::default());

    assert!(matches!(result, Err(StampError::Pdf(_))));
    assert!(!f.qr_png.exists());
    assert!(!f.output.exists());
}

#[test]
fn test_missing_qr_png() {
    let f = fixture(&[(612, 792)]);
    let missing = f.dir.path().join("qr_missing.png");

    let result = overlay_qr_on_pdf(&f.input, &f.output, &missing, &StampLayout::default());
    assert!(matches!(result, Err(StampError::Io(_))));
}

#[test]
fn test_caption_skipped_when_off_page() {
    let f = fixture(&[(612, 792), (300, 300)]);
    let layout = StampLayout::default().with_margin(8.0);

    let report = overlay_qr_on_pdf(&f.input, &f.output, &f.qr_png, &layout).unwrap();
    assert_eq!(report.pages, 2);
    assert_eq!(report.labelled_pages, 0);

    let doc = lopdf::Document::load(&f.output).unwrap();
    assert!(!page_content(&doc, 1).contains("Tj"));
}

#[test]
fn test_input_untouched() {
    let f = fixture(&[(612, 792)]);
    let before = std::fs::read(&f.input).unwrap();

    overlay_qr_on_pdf(&f.input, &f.output, &f.qr_png, &StampLayout::default()).unwrap();

    assert_eq!(std::fs::read(&f.input).unwrap(), before);
}
