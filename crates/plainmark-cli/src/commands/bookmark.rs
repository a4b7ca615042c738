//! Bookmark command handlers

use anyhow::{anyhow, bail, Context, Result};
use clap::Args;
use url::Url;

use plainmark_core::format::{self, render_record};
use plainmark_core::{Draft, Filter, Record, RecordId, RecordPatch, Store};

use crate::editor::{confirm, edit_text, is_interactive, prompt_with_default};
use crate::metadata::fetch_metadata;
use crate::output::Output;

/// Fields for `pmark add`
#[derive(Args, Debug, Clone, Default)]
pub struct AddArgs {
    /// URL to save
    pub url: String,
    /// Tags to add
    #[arg(short, long)]
    pub tag: Vec<String>,
    /// Title (fetched from the page with --fetch when omitted)
    #[arg(short = 'T', long)]
    pub title: Option<String>,
    /// Notes
    #[arg(short, long)]
    pub notes: Option<String>,
    /// Fetch title, description, site name, authors and image from the page
    #[arg(short, long)]
    pub fetch: bool,
}

/// Fields for `pmark edit`
///
/// With no field flags and no --editor, prompts for each field.
#[derive(Args, Debug, Clone, Default)]
pub struct EditArgs {
    /// New URL
    #[arg(long)]
    pub url: Option<String>,
    /// New title (empty string clears it)
    #[arg(short = 'T', long)]
    pub title: Option<String>,
    /// Replace all tags (repeatable; `--tag ""` clears them)
    #[arg(short, long)]
    pub tag: Vec<String>,
    /// Add a tag
    #[arg(long)]
    pub add_tag: Vec<String>,
    /// Remove a tag
    #[arg(long)]
    pub remove_tag: Vec<String>,
    /// New notes (empty string clears them)
    #[arg(short, long)]
    pub notes: Option<String>,
    /// Edit the whole entry in $EDITOR
    #[arg(short, long)]
    pub editor: bool,
}

impl EditArgs {
    fn to_patch(&self) -> RecordPatch {
        RecordPatch {
            url: self.url.clone(),
            title: self.title.clone().map(non_empty),
            tags: (!self.tag.is_empty()).then(|| self.tag.clone()),
            add_tags: self.add_tag.clone(),
            remove_tags: self.remove_tag.clone(),
            notes: self.notes.clone().map(non_empty),
        }
    }
}

/// Add a bookmark
pub async fn add(
    store: &mut Store,
    args: AddArgs,
    warn_duplicates: bool,
    output: &Output,
) -> Result<()> {
    let url = args.url.trim();
    if !url.is_empty() && Url::parse(url).is_err() {
        output.warning(&format!("{} is not an absolute URL", url));
    }

    let mut draft = Draft {
        url: args.url,
        title: args.title,
        tags: args.tag,
        notes: args.notes,
        extra: Vec::new(),
    };

    if args.fetch {
        let metadata = fetch_metadata(draft.url.trim()).await;
        draft.title = draft.title.or(metadata.title.clone());
        draft.notes = draft.notes.or(metadata.description.clone());
        for (key, value) in metadata.extra_fields() {
            draft = draft.with_extra(key, value);
        }
    }

    let added = store.add(draft).context("Failed to add bookmark")?;
    store.save().context("Failed to save bookmarks")?;

    if warn_duplicates && !added.duplicates.is_empty() {
        let ids: Vec<String> = added.duplicates.iter().map(|id| id.to_string()).collect();
        output.warning(&format!("Already bookmarked as {}", ids.join(", ")));
    }

    let record = find(store, added.id)?;
    output.success(&format!("Added bookmark: {}", added.id));
    output.print_record(record);

    Ok(())
}

/// List bookmarks, optionally filtered by tags (all must match)
pub fn list(store: &Store, tags: Vec<String>, output: &Output) -> Result<()> {
    let filter = Filter::all_of(tags.into_iter().map(Filter::tag));
    output.print_records(&store.query(&filter));
    Ok(())
}

/// Search bookmarks; every word must appear in the URL, title or notes
pub fn search(store: &Store, query: String, output: &Output) -> Result<()> {
    let filter = Filter::all_of(query.split_whitespace().map(Filter::text));
    output.print_records(&store.query(&filter));
    Ok(())
}

/// Show a single bookmark
pub fn show(store: &Store, id: &str, output: &Output) -> Result<()> {
    let record = find(store, parse_id(id)?)?;
    output.print_record(record);
    Ok(())
}

/// Edit a bookmark
pub fn edit(store: &mut Store, id: &str, args: EditArgs, output: &Output) -> Result<()> {
    let id = parse_id(id)?;
    let record = find(store, id)?;

    let patch = if args.editor {
        let edited = edit_text(&render_record(record))?;
        patch_from_text(record, &edited)?
    } else {
        let patch = args.to_patch();
        if patch.is_empty() {
            if !is_interactive() || !output.should_prompt() {
                bail!("Nothing to change. Pass --url, --title, --tag, --add-tag, --remove-tag, --notes or --editor.");
            }
            prompt_patch(record)?
        } else {
            patch
        }
    };

    let updated = store.update(id, &patch).context("Failed to update bookmark")?;
    if !store.is_dirty() {
        output.message("No changes.");
        return Ok(());
    }
    store.save().context("Failed to save bookmarks")?;

    output.success("Bookmark updated");
    output.print_record(&updated);

    Ok(())
}

/// Remove a bookmark
pub fn remove(store: &mut Store, id: &str, output: &Output) -> Result<()> {
    let id = parse_id(id)?;
    let record = find(store, id)?;

    if output.should_prompt() && is_interactive() {
        println!("Remove bookmark: {} - {}", record.id, record.display_title());
        if !confirm("Are you sure?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    store.remove(id).context("Failed to remove bookmark")?;
    store.save().context("Failed to save bookmarks")?;

    output.success(&format!("Removed bookmark: {}", id));

    Ok(())
}

/// Open a bookmark in the default browser
pub fn open(store: &Store, id: &str, output: &Output) -> Result<()> {
    let record = find(store, parse_id(id)?)?;
    open::that(&record.url).with_context(|| format!("Failed to open {}", record.url))?;
    output.message(&format!("Opened {}", record.url));
    Ok(())
}

/// Parse a bookmark id, accepting the `[12]` form used in the file
fn parse_id(id: &str) -> Result<RecordId> {
    let trimmed = id.trim().trim_start_matches('[').trim_end_matches(']');
    trimmed
        .parse()
        .with_context(|| format!("Invalid bookmark id: {}", id))
}

fn find(store: &Store, id: RecordId) -> Result<&Record> {
    store
        .get(id)
        .ok_or_else(|| anyhow!("Bookmark not found: {}", id))
}

/// Turn an edited entry back into a patch for the original record
fn patch_from_text(record: &Record, text: &str) -> Result<RecordPatch> {
    let parsed = format::parse(text).context("Edited entry is not valid")?;
    if let Some(warning) = parsed.warnings.first() {
        bail!("Edited entry is not valid: {}", warning);
    }

    let records: Vec<&Record> = parsed.document.records().collect();
    let edited = match records.as_slice() {
        [edited] => *edited,
        [] => bail!("Edited text contains no bookmark. Use `pmark rm` to remove it."),
        _ => bail!("Edited text contains more than one bookmark"),
    };
    if edited.id != record.id {
        bail!(
            "Changing the id is not supported ({} -> {})",
            record.id,
            edited.id
        );
    }

    Ok(RecordPatch {
        url: Some(edited.url.clone()),
        title: Some(edited.title.clone()),
        tags: Some(edited.tags.to_vec()),
        notes: Some(edited.notes.clone()),
        ..RecordPatch::default()
    })
}

/// Prompt for each field; `-` clears a field
fn prompt_patch(record: &Record) -> Result<RecordPatch> {
    println!("Editing bookmark: {}", record.id);
    println!("Press Enter to keep current value, type `-` to clear it.\n");

    let mut patch = RecordPatch::default();

    if let Some(url) = prompt_with_default("URL", &record.url)? {
        patch.url = Some(url);
    }
    if let Some(title) = prompt_with_default("Title", record.title.as_deref().unwrap_or(""))? {
        patch.title = Some(cleared(title));
    }
    if let Some(tags) = prompt_with_default("Tags (comma-separated)", &record.tags.joined())? {
        patch.tags = Some(match cleared(tags) {
            Some(tags) => tags.split(',').map(|t| t.trim().to_string()).collect(),
            None => Vec::new(),
        });
    }

    Ok(patch)
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

fn cleared(value: String) -> Option<String> {
    if value == "-" {
        None
    } else {
        non_empty(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;
    use tempfile::TempDir;

    fn test_store(temp_dir: &TempDir) -> Store {
        let mut store = Store::load(temp_dir.path().join("bookmarks.txt")).unwrap();
        store
            .add(
                Draft::new("https://example.com")
                    .with_title("Example")
                    .with_tags(["web", "reference"])
                    .with_notes("Some notes"),
            )
            .unwrap();
        store.save().unwrap();
        store
    }

    fn quiet() -> Output {
        Output::new(OutputFormat::Quiet)
    }

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id("12").unwrap(), RecordId(12));
        assert_eq!(parse_id("[7]").unwrap(), RecordId(7));
        assert!(parse_id("abc").is_err());
        assert!(parse_id("").is_err());
    }

    #[test]
    fn test_edit_args_to_patch() {
        let args = EditArgs {
            title: Some(String::new()),
            tag: vec!["a".to_string(), "b".to_string()],
            add_tag: vec!["c".to_string()],
            notes: Some("new notes".to_string()),
            ..EditArgs::default()
        };
        let patch = args.to_patch();
        assert_eq!(patch.url, None);
        assert_eq!(patch.title, Some(None));
        assert_eq!(patch.tags, Some(vec!["a".to_string(), "b".to_string()]));
        assert_eq!(patch.add_tags, vec!["c".to_string()]);
        assert_eq!(patch.notes, Some(Some("new notes".to_string())));

        assert!(EditArgs::default().to_patch().is_empty());
    }

    #[test]
    fn test_patch_from_edited_text() {
        let temp_dir = TempDir::new().unwrap();
        let store = test_store(&temp_dir);
        let record = store.get(RecordId(1)).unwrap();

        let edited = render_record(record)
            .replace("title: Example", "title: Better Title")
            .replace("tags: web, reference", "tags: web");
        let patch = patch_from_text(record, &edited).unwrap();

        let updated = record.apply(&patch).unwrap();
        assert_eq!(updated.title.as_deref(), Some("Better Title"));
        assert_eq!(updated.tags.to_vec(), vec!["web".to_string()]);
        assert_eq!(updated.notes.as_deref(), Some("Some notes"));
        assert_eq!(updated.added, record.added);
    }

    #[test]
    fn test_patch_from_text_rejects_bad_edits() {
        let temp_dir = TempDir::new().unwrap();
        let store = test_store(&temp_dir);
        let record = store.get(RecordId(1)).unwrap();

        assert!(patch_from_text(record, "").is_err());
        assert!(patch_from_text(record, "[2] https://example.com\n").is_err());
        assert!(patch_from_text(record, "[1] https://a.com\n\n[3] https://b.com\n").is_err());
        assert!(patch_from_text(record, "[1] https://a.com\n  stray\n").is_err());
    }

    #[test]
    fn test_edit_with_flags_saves() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = test_store(&temp_dir);

        let args = EditArgs {
            add_tag: vec!["Rust".to_string()],
            ..EditArgs::default()
        };
        edit(&mut store, "1", args, &quiet()).unwrap();
        assert!(!store.is_dirty());

        let reloaded = Store::load(store.path()).unwrap();
        assert!(reloaded.get(RecordId(1)).unwrap().tags.contains("rust"));
    }

    #[test]
    fn test_remove_without_prompt_in_quiet_mode() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = test_store(&temp_dir);

        remove(&mut store, "1", &quiet()).unwrap();
        assert!(store.is_empty());
        assert!(Store::load(store.path()).unwrap().is_empty());

        assert!(remove(&mut store, "1", &quiet()).is_err());
    }

    #[test]
    fn test_show_unknown_id() {
        let temp_dir = TempDir::new().unwrap();
        let store = test_store(&temp_dir);
        let err = show(&store, "99", &quiet()).unwrap_err();
        assert!(err.to_string().contains("Bookmark not found: 99"));
    }

    #[tokio::test]
    async fn test_add_keeps_text_that_is_not_an_absolute_url() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = test_store(&temp_dir);

        let args = AddArgs {
            url: "  notes/reading-list.md ".to_string(),
            ..AddArgs::default()
        };
        add(&mut store, args, true, &quiet()).await.unwrap();

        let reloaded = Store::load(store.path()).unwrap();
        assert_eq!(
            reloaded.get(RecordId(2)).unwrap().url,
            "notes/reading-list.md"
        );
    }

    #[tokio::test]
    async fn test_add_saves_and_normalizes() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = test_store(&temp_dir);

        let args = AddArgs {
            url: "https://EXAMPLE.com/".to_string(),
            tag: vec!["Dup".to_string()],
            ..AddArgs::default()
        };
        add(&mut store, args, true, &quiet()).await.unwrap();

        let reloaded = Store::load(store.path()).unwrap();
        assert_eq!(reloaded.len(), 2);
        assert_eq!(
            reloaded.duplicates_of("https://example.com").len(),
            2
        );
        assert_eq!(
            reloaded.query(&Filter::tag("dup"))[0].id,
            RecordId(2)
        );
    }
}
