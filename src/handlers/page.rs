use axum::response::Html;

use crate::models::ConversionKind;

const ROUTES: [(ConversionKind, &str, &str); 3] = [
    (ConversionKind::PdfToDocx, "/convert/pdf-to-word", ".pdf"),
    (ConversionKind::DocxToPdf, "/convert/word-to-pdf", ".docx"),
    (ConversionKind::ImageToSvg, "/convert/jpg-svg", ".jpg,.jpeg,.png"),
];

/// Upload page
/// GET /
pub async fn index() -> Html<String> {
    let mut html = String::from(
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>docshift</title></head><body>\n<h1>docshift</h1>\n",
    );

    for (kind, action, accept) in ROUTES {
        html.push_str(&format!(
            "<section>\n<h2>{}</h2>\n<form method=\"post\" action=\"{}\" enctype=\"multipart/form-data\">\n<input type=\"file\" name=\"file\" accept=\"{}\" required>\n<button type=\"submit\">Convert</button>\n</form>\n</section>\n",
            kind.label(),
            action,
            accept
        ));
    }

    html.push_str("<p><a href=\"/converted-files\">Converted files</a></p>\n</body></html>\n");
    Html(html)
}
