/// End-to-end pipeline tests
/// Locate → fetch → transcribe → assemble → bundle, with stubbed network, OCR and translation
mod common;

use common::{img_tags, png, pipeline, StubSite};
use rust_manga_translator::document::{cbz_image_entries, read_page_lines};
use rust_manga_translator::models::{ChapterJob, ChapterStatus};
use rust_manga_translator::packager::list_entries;

const BASE: &str = "https://example.com/series/Foo";

fn job(start: u32, end: u32) -> ChapterJob {
    ChapterJob {
        base_url: BASE.to_string(),
        start,
        end,
        source_lang: "auto".to_string(),
        target_lang: "de".to_string(),
        session: "abcd1234".to_string(),
    }
}

fn two_image_site() -> StubSite {
    StubSite::new()
        .page(
            "https://example.com/series/Foo/chapter-1",
            &img_tags(&["https://cdn.example.com/foo/1/a.png", "https://cdn.example.com/foo/1/b.png"]),
        )
        .image("https://cdn.example.com/foo/1/a.png", png(1))
        .image("https://cdn.example.com/foo/1/b.png", png(2))
}

#[tokio::test]
async fn test_single_chapter_export() {
    let dir = tempfile::tempdir().unwrap();
    let result = pipeline(dir.path(), two_image_site()).run(&job(1, 1)).await.unwrap();

    assert_eq!(result.title, "Foo");
    assert_eq!(result.session, "abcd1234");
    assert!(result.failed_chapters.is_empty());
    assert_eq!(
        result.bundle,
        dir.path().join("Foo_abcd1234").join("Foo_abcd1234_export.zip")
    );

    let entries = list_entries(&result.bundle).unwrap();
    assert_eq!(entries, vec!["Foo_Kapitel01.pdf", "Foo_Kapitel01.cbz"]);

    let chapter = &result.chapters[0];
    assert_eq!(chapter.status, ChapterStatus::Completed);
    assert_eq!(chapter.images_saved, 2);
    let artifacts = chapter.artifacts.as_ref().unwrap();

    let pages = read_page_lines(&artifacts.pdf).unwrap();
    assert_eq!(pages.len(), 2);
    assert_eq!(pages[0], vec!["001.png", "TEXT OF 001.PNG"]);
    assert_eq!(pages[1], vec!["002.png", "TEXT OF 002.PNG"]);

    assert_eq!(
        cbz_image_entries(&artifacts.cbz).unwrap(),
        vec!["001.png", "002.png"]
    );

    let images = dir.path().join("Foo_abcd1234").join("chapter_01");
    assert!(images.join("001.png").is_file());
    assert!(images.join("002.png").is_file());
}

#[tokio::test]
async fn test_chapter_without_images_is_left_out() {
    let dir = tempfile::tempdir().unwrap();
    let site = two_image_site().page(
        "https://example.com/series/Foo/chapter-2",
        "<html><body><p>Coming soon</p></body></html>",
    );

    let result = pipeline(dir.path(), site).run(&job(1, 2)).await.unwrap();

    assert_eq!(result.failed_chapters, vec![2]);
    assert_eq!(result.chapters[1].status, ChapterStatus::NoImages);
    let entries = list_entries(&result.bundle).unwrap();
    assert_eq!(entries, vec!["Foo_Kapitel01.pdf", "Foo_Kapitel01.cbz"]);
}

#[tokio::test]
async fn test_unreachable_chapter_does_not_abort_job() {
    let dir = tempfile::tempdir().unwrap();
    // chapter-3 is not served at all
    let result = pipeline(dir.path(), two_image_site()).run(&job(1, 3)).await.unwrap();

    assert_eq!(result.failed_chapters, vec![2, 3]);
    assert!(matches!(result.chapters[2].status, ChapterStatus::Failed(_)));
    assert_eq!(list_entries(&result.bundle).unwrap().len(), 2);
}

#[tokio::test]
async fn test_all_chapters_failing_still_writes_bundle() {
    let dir = tempfile::tempdir().unwrap();
    let result = pipeline(dir.path(), StubSite::new()).run(&job(1, 1)).await.unwrap();

    assert_eq!(result.failed_chapters, vec![1]);
    assert!(result.bundle.is_file());
    assert!(list_entries(&result.bundle).unwrap().is_empty());
}

#[tokio::test]
async fn test_duplicate_image_url_saved_once() {
    let dir = tempfile::tempdir().unwrap();
    let site = StubSite::new()
        .page(
            "https://example.com/series/Foo/chapter-1",
            &img_tags(&["https://cdn.example.com/x.png", "https://cdn.example.com/x.png"]),
        )
        .image("https://cdn.example.com/x.png", png(9));

    let result = pipeline(dir.path(), site).run(&job(1, 1)).await.unwrap();

    assert_eq!(result.chapters[0].images_saved, 1);
    let cbz = &result.chapters[0].artifacts.as_ref().unwrap().cbz;
    assert_eq!(cbz_image_entries(cbz).unwrap(), vec!["001.png"]);
}

#[tokio::test]
async fn test_broken_image_leaves_no_gap() {
    let dir = tempfile::tempdir().unwrap();
    let site = StubSite::new()
        .page(
            "https://example.com/series/Foo/chapter-1",
            &img_tags(&[
                "https://cdn.example.com/1.png",
                "https://cdn.example.com/missing.png",
                "https://cdn.example.com/3.png",
            ]),
        )
        .image("https://cdn.example.com/1.png", png(1))
        .image("https://cdn.example.com/3.png", png(3));

    let p = pipeline(dir.path(), site);
    let result = p.run(&job(1, 1)).await.unwrap();

    let chapter = &result.chapters[0];
    assert_eq!(chapter.images_located, 3);
    assert_eq!(chapter.images_saved, 2);
    let cbz = &chapter.artifacts.as_ref().unwrap().cbz;
    assert_eq!(cbz_image_entries(cbz).unwrap(), vec!["001.png", "002.png"]);

    let fetch = p.metrics().get_metrics("fetch").unwrap();
    assert_eq!(fetch.failed_requests, 1);
    assert_eq!(p.metrics().get_metrics("chapter").unwrap().successful_requests, 1);
}

#[tokio::test]
async fn test_invalid_range_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let err = pipeline(dir.path(), StubSite::new()).run(&job(3, 1)).await;
    assert!(err.is_err());
}

#[tokio::test]
async fn test_direct_chapter_url_scraped_as_is() {
    let dir = tempfile::tempdir().unwrap();
    let chapter_page = "https://example.com/series/Foo/chapter-5";
    let site = StubSite::new()
        .page(chapter_page, &img_tags(&["https://cdn.example.com/foo/5/a.png"]))
        .image("https://cdn.example.com/foo/5/a.png", png(5));

    let mut direct = job(1, 1);
    direct.base_url = chapter_page.to_string();
    let result = pipeline(dir.path(), site).run(&direct).await.unwrap();

    assert_eq!(result.title, "Foo");
    assert!(result.failed_chapters.is_empty());
    assert_eq!(result.chapters[0].url, chapter_page);
    assert_eq!(result.chapters[0].status, ChapterStatus::Completed);
    assert_eq!(
        list_entries(&result.bundle).unwrap(),
        vec!["Foo_Kapitel01.pdf", "Foo_Kapitel01.cbz"]
    );
}

#[tokio::test]
async fn test_chapter_url_with_range_still_appends_suffix() {
    let dir = tempfile::tempdir().unwrap();
    let mut ranged = job(1, 2);
    ranged.base_url = "https://example.com/series/Foo/chapter-5".to_string();
    let result = pipeline(dir.path(), StubSite::new()).run(&ranged).await.unwrap();

    assert_eq!(
        result.chapters[0].url,
        "https://example.com/series/Foo/chapter-5/chapter-1"
    );
}
