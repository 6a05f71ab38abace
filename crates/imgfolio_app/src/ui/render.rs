use imgfolio_core::{AppViewModel, GalleryRowView};
use imgfolio_engine::{JobProgress, Stage};

const MAX_URL_WIDTH: usize = 96;

/// Lines describing what changed between two views.
pub fn render_changes(prev: &AppViewModel, next: &AppViewModel) -> Vec<String> {
    let mut lines = Vec::new();

    if next.loading && !prev.loading {
        lines.push(format!("Fetching {} ...", next.input.trim()));
    }
    if next.downloading && !prev.downloading {
        lines.push(format!("Building PDF from {} images ...", next.selected.len()));
    }
    if next.error_message != prev.error_message {
        if let Some(message) = &next.error_message {
            lines.push(format!("error: {message}"));
        }
    }

    let gallery_replaced = gallery_urls(prev) != gallery_urls(next);
    if gallery_replaced && !next.gallery.is_empty() {
        if let Some(page) = &next.page_url {
            lines.push(format!("{} images on {}", next.gallery.len(), page));
        }
        lines.extend(gallery_lines(next));
    } else if prev.selected != next.selected {
        lines.push(selection_summary(next));
    }

    if next.last_pdf != prev.last_pdf {
        if let Some(pdf) = &next.last_pdf {
            lines.push(format!(
                "Saved {} {} to {} ({} bytes)",
                pdf.page_count,
                if pdf.page_count == 1 { "page" } else { "pages" },
                pdf.path,
                pdf.byte_len
            ));
        }
    }
    lines
}

pub fn gallery_lines(view: &AppViewModel) -> Vec<String> {
    if view.gallery.is_empty() {
        return vec!["No images loaded. Use `fetch <url>`.".to_string()];
    }
    view.gallery.iter().map(gallery_row).collect()
}

fn gallery_row(row: &GalleryRowView) -> String {
    let mark = match row.selection_number {
        Some(n) => format!("[{n:>2}]"),
        None => "[  ]".to_string(),
    };
    format!("{:>4} {} {}", row.index, mark, shorten(&row.url))
}

pub fn selected_lines(view: &AppViewModel) -> Vec<String> {
    if view.selected.is_empty() {
        return vec!["Nothing selected.".to_string()];
    }
    view.selected
        .iter()
        .map(|row| format!("{:>4}. {}", row.number, shorten(&row.url)))
        .collect()
}

pub fn selection_summary(view: &AppViewModel) -> String {
    let positions: Vec<String> = view
        .selected
        .iter()
        .filter_map(|row| {
            view.gallery
                .iter()
                .find(|g| g.url == row.url)
                .map(|g| g.index.to_string())
        })
        .collect();
    match positions.len() {
        0 => "Selection cleared.".to_string(),
        n => format!("{} selected: {}", n, positions.join(" ")),
    }
}

pub fn progress_line(progress: &JobProgress) -> Option<String> {
    match progress.stage {
        Stage::Rasterizing { index, total } => Some(format!("  image {index}/{total}")),
        Stage::Writing => Some("  writing pdf".to_string()),
        _ => None,
    }
}

fn gallery_urls(view: &AppViewModel) -> Vec<&str> {
    view.gallery.iter().map(|row| row.url.as_str()).collect()
}

fn shorten(url: &str) -> String {
    if url.chars().count() <= MAX_URL_WIDTH {
        return url.to_string();
    }
    let head: String = url.chars().take(MAX_URL_WIDTH - 3).collect();
    format!("{head}...")
}

#[cfg(test)]
mod tests {
    use imgfolio_core::{PdfSummary, SelectedRowView};
    use pretty_assertions::assert_eq;

    use super::*;

    fn row(index: usize, url: &str, selection_number: Option<usize>) -> GalleryRowView {
        GalleryRowView {
            index,
            url: url.to_string(),
            selection_number,
        }
    }

    fn loaded() -> AppViewModel {
        AppViewModel {
            page_url: Some("https://site.test/".into()),
            gallery: vec![
                row(1, "https://site.test/a.png", None),
                row(2, "https://site.test/b.png", None),
            ],
            ..AppViewModel::default()
        }
    }

    #[test]
    fn new_gallery_is_listed() {
        let lines = render_changes(&AppViewModel::default(), &loaded());
        assert_eq!(
            lines,
            vec![
                "2 images on https://site.test/".to_string(),
                "   1 [  ] https://site.test/a.png".to_string(),
                "   2 [  ] https://site.test/b.png".to_string(),
            ]
        );
    }

    #[test]
    fn selection_changes_print_gallery_positions_in_selection_order() {
        let prev = loaded();
        let mut next = loaded();
        next.gallery[0].selection_number = Some(2);
        next.gallery[1].selection_number = Some(1);
        next.selected = vec![
            SelectedRowView {
                number: 1,
                url: "https://site.test/b.png".into(),
            },
            SelectedRowView {
                number: 2,
                url: "https://site.test/a.png".into(),
            },
        ];
        assert_eq!(render_changes(&prev, &next), vec!["2 selected: 2 1".to_string()]);
        assert_eq!(gallery_lines(&next)[0], "   1 [ 2] https://site.test/a.png");
    }

    #[test]
    fn errors_and_saved_pdfs_are_reported_once() {
        let prev = loaded();
        let mut next = loaded();
        next.error_message = Some("Failed to create the PDF.".into());
        assert_eq!(
            render_changes(&prev, &next),
            vec!["error: Failed to create the PDF.".to_string()]
        );
        assert!(render_changes(&next, &next).is_empty());

        let mut saved = loaded();
        saved.last_pdf = Some(PdfSummary {
            path: "./images.pdf".into(),
            page_count: 1,
            byte_len: 900,
        });
        assert_eq!(
            render_changes(&prev, &saved),
            vec!["Saved 1 page to ./images.pdf (900 bytes)".to_string()]
        );
    }

    #[test]
    fn long_urls_are_shortened() {
        let url = format!("https://site.test/{}", "x".repeat(200));
        let shortened = shorten(&url);
        assert_eq!(shortened.chars().count(), MAX_URL_WIDTH);
        assert!(shortened.ends_with("..."));
    }

    #[test]
    fn only_page_progress_is_shown() {
        let progress = |stage| JobProgress {
            request_id: 1,
            stage,
            bytes: None,
        };
        assert_eq!(
            progress_line(&progress(Stage::Rasterizing { index: 2, total: 3 })),
            Some("  image 2/3".to_string())
        );
        assert_eq!(progress_line(&progress(Stage::Queued)), None);
    }
}
