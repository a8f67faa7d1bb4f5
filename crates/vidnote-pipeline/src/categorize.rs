//! Categorization stage.
//!
//! Derives a single lowercase label from title + summary and resolves it to
//! a category record, creating one lazily on first sight. The suggested
//! list below is guidance for the model only; any label it returns is
//! accepted, so free-text categories are valid and create new records.

use std::sync::Arc;
use tracing::{info, warn};

use vidnote_engines::{EngineError, TextGenerator};
use vidnote_models::CategoryRecord;
use vidnote_store::{RecordStore, StoreError, StoreResult};

/// Label used whenever the generation backend cannot produce one.
pub const FALLBACK_CATEGORY: &str = "general";

/// Fixed display palette. Colors are assigned round-robin by current
/// category count, so reuse only begins once the palette is exhausted.
const CATEGORY_COLORS: [&str; 17] = [
    "#EF4444", "#F97316", "#F59E0B", "#EAB308", "#84CC16", "#22C55E", "#10B981", "#14B8A6",
    "#06B6D4", "#0EA5E9", "#3B82F6", "#6366F1", "#8B5CF6", "#A855F7", "#D946EF", "#EC4899",
    "#F43F5E",
];

const SYSTEM_PROMPT: &str = "\
You are a content categorization assistant.
Given a title and summary text, determine the most appropriate category.
Respond with ONLY the single category name in lowercase, no other text or explanation.

Choose from these categories:
- technology
- education
- entertainment
- science
- health & fitness
- business
- programming
- gaming
- music
- news
- politics
- travel
- food & cooking
- art & design
- sports
- finance
- productivity
- lifestyle
- tutorials
- reviews
- general";

/// Pick the palette color for the `index`-th created category.
pub fn palette_color(index: usize) -> &'static str {
    CATEGORY_COLORS[index % CATEGORY_COLORS.len()]
}

/// Derive a category label. Never fails; backend faults yield
/// [`FALLBACK_CATEGORY`].
pub async fn categorize_content(
    generator: &dyn TextGenerator,
    title: &str,
    summary: &str,
) -> String {
    let title = title.trim();
    let summary = summary.trim();
    if title.is_empty() && summary.is_empty() {
        return FALLBACK_CATEGORY.to_string();
    }

    let user_prompt = format!(
        "Title: {}\n\nSummary:\n{}\n\nBased on the title and summary above, what is the most \
         appropriate category? Respond with only the category name.",
        title,
        if summary.is_empty() {
            "No summary provided"
        } else {
            summary
        }
    );

    match generator.generate(SYSTEM_PROMPT, &user_prompt).await {
        Ok(raw) => {
            let label = normalize_label(&raw);
            if label.is_empty() {
                warn!("generator returned blank category label, using fallback");
                return FALLBACK_CATEGORY.to_string();
            }
            info!(category = %label, "category determined");
            label
        }
        Err(e) => {
            log_fallback(&e);
            FALLBACK_CATEGORY.to_string()
        }
    }
}

fn log_fallback(error: &EngineError) {
    match error {
        EngineError::NotFound(_) => {
            warn!("generation endpoint not found, using fallback category")
        }
        EngineError::Connection(_) => {
            warn!("cannot connect to generation backend, using fallback category")
        }
        EngineError::Timeout(_) => {
            warn!("generation request timed out, using fallback category")
        }
        other => warn!(error = %other, "categorization failed, using fallback category"),
    }
}

/// Normalize a raw model completion into a category label: first line only,
/// one leading `-`/`*` stripped, one trailing `.` stripped, lowercase.
pub fn normalize_label(raw: &str) -> String {
    let mut label = raw.trim().to_lowercase();
    if let Some(first_line) = label.lines().next() {
        label = first_line.trim().to_string();
    }
    if let Some(rest) = label.strip_prefix('-') {
        label = rest.trim().to_string();
    }
    if let Some(rest) = label.strip_prefix('*') {
        label = rest.trim().to_string();
    }
    if let Some(rest) = label.strip_suffix('.') {
        label = rest.trim().to_string();
    }
    label
}

/// Find a category by name or create it with the next palette color.
pub async fn get_or_create_category(
    store: &Arc<dyn RecordStore>,
    name: &str,
) -> StoreResult<CategoryRecord> {
    if let Some(existing) = store.find_category_by_name(name).await? {
        return Ok(existing);
    }

    let color = palette_color(store.count_categories().await?);
    let category = CategoryRecord::new(name, format!("Videos about {}", name), color);

    match store.insert_category(category.clone()).await {
        Ok(()) => Ok(category),
        // Lost a creation race with another run; the winner's record stands.
        Err(StoreError::Conflict(_)) => store
            .find_category_by_name(name)
            .await?
            .ok_or_else(|| StoreError::not_found(format!("category {}", name))),
        Err(e) => Err(e),
    }
}

/// Categorize an item and resolve the label to a record. `None` when there
/// is nothing to categorize.
pub async fn auto_categorize(
    store: &Arc<dyn RecordStore>,
    generator: &dyn TextGenerator,
    title: &str,
    summary: &str,
) -> StoreResult<Option<CategoryRecord>> {
    if title.trim().is_empty() && summary.trim().is_empty() {
        return Ok(None);
    }

    let label = categorize_content(generator, title, summary).await;
    let category = get_or_create_category(store, &label).await?;
    Ok(Some(category))
}

#[cfg(test)]
mod tests {
    use super::*;
    use vidnote_store::MemoryStore;

    #[test]
    fn test_normalize_label() {
        assert_eq!(normalize_label("Education"), "education");
        assert_eq!(normalize_label("- education"), "education");
        assert_eq!(normalize_label("* education."), "education");
        assert_eq!(normalize_label("education.\nbecause it teaches"), "education");
        assert_eq!(normalize_label("  Food & Cooking  "), "food & cooking");
    }

    #[test]
    fn test_palette_wraps_after_exhaustion() {
        assert_eq!(palette_color(0), "#EF4444");
        assert_eq!(palette_color(16), "#F43F5E");
        assert_eq!(palette_color(17), "#EF4444");
    }

    struct StaticGenerator(&'static str);

    #[async_trait::async_trait]
    impl TextGenerator for StaticGenerator {
        async fn generate(&self, _system: &str, _user: &str) -> Result<String, EngineError> {
            Ok(self.0.to_string())
        }
    }

    struct DownGenerator;

    #[async_trait::async_trait]
    impl TextGenerator for DownGenerator {
        async fn generate(&self, _system: &str, _user: &str) -> Result<String, EngineError> {
            Err(EngineError::Connection("refused".into()))
        }
    }

    #[tokio::test]
    async fn test_backend_fault_falls_back_to_general() {
        let label = categorize_content(&DownGenerator, "Title", "Summary").await;
        assert_eq!(label, FALLBACK_CATEGORY);
    }

    #[tokio::test]
    async fn test_blank_inputs_fall_back_without_calling_backend() {
        let label = categorize_content(&DownGenerator, "  ", "").await;
        assert_eq!(label, FALLBACK_CATEGORY);
    }

    #[tokio::test]
    async fn test_free_text_label_creates_category() {
        let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());
        let generator = StaticGenerator("urban beekeeping");

        let category = auto_categorize(&store, &generator, "Bees!", "A hive tour")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(category.name, "urban beekeeping");
        assert_eq!(category.color, palette_color(0));
        assert_eq!(category.description, "Videos about urban beekeeping");
    }

    #[tokio::test]
    async fn test_existing_category_is_reused() {
        let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());
        let first = get_or_create_category(&store, "music").await.unwrap();
        let second = get_or_create_category(&store, "music").await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(store.count_categories().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_colors_assigned_round_robin() {
        let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());
        for i in 0..3 {
            let category = get_or_create_category(&store, &format!("cat-{}", i))
                .await
                .unwrap();
            assert_eq!(category.color, palette_color(i));
        }
    }

    #[tokio::test]
    async fn test_nothing_to_categorize() {
        let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());
        let result = auto_categorize(&store, &DownGenerator, "", " ").await.unwrap();
        assert!(result.is_none());
    }
}
