//! The eight command handlers.
//!
//! Store errors are not caught here; they propagate out of the router and
//! abort the one command being processed.

use std::io::ErrorKind;

use tracing::debug;

use crate::error::AppError;
use crate::records::{ModelRecord, Models};

use super::Reply;
use super::context::{AppContext, CallerId};
use super::texts;

pub(super) async fn start(ctx: &AppContext, caller: CallerId) -> Vec<Reply> {
    ctx.greet(caller).await;
    vec![Reply::text(texts::WELCOME)]
}

pub(super) fn help() -> Vec<Reply> {
    vec![Reply::text(texts::HELP)]
}

pub(super) fn corpuses(ctx: &AppContext) -> Result<Vec<Reply>, AppError> {
    let models = ctx.store().load()?;
    Ok(vec![Reply::Text(building_list(&models))])
}

/// One `name: description` line per record, or the empty-store notice.
pub fn building_list(models: &Models) -> String {
    if models.is_empty() {
        return texts::NO_BUILDINGS.to_string();
    }
    models
        .iter()
        .map(|(name, record)| format!("{name}: {}", record.description))
        .collect::<Vec<_>>()
        .join("\n")
}

pub(super) async fn gallery(ctx: &AppContext) -> Result<Vec<Reply>, AppError> {
    let models = ctx.store().load()?;
    let mut replies = Vec::new();

    for (name, record) in &models {
        // A blank path means no image.
        let Some(raw_path) = record.image.as_deref().filter(|p| !p.trim().is_empty()) else {
            continue;
        };
        let path = ctx.resolve_path(raw_path);
        match tokio::fs::read(&path).await {
            Ok(data) => {
                let file_name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| name.clone());
                replies.push(Reply::Photo {
                    data,
                    file_name,
                    caption: record.description.clone(),
                });
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(model = %name, path = %path.display(), "gallery image missing, skipping");
            }
            Err(e) => {
                return Err(AppError::Store(format!(
                    "cannot read image {}: {e}",
                    path.display()
                )));
            }
        }
    }

    Ok(replies)
}

pub(super) fn news(ctx: &AppContext) -> Vec<Reply> {
    vec![Reply::Text(ctx.content().news.clone())]
}

pub(super) fn resources(ctx: &AppContext) -> Vec<Reply> {
    vec![Reply::Text(ctx.content().resources.clone())]
}

pub(super) async fn stats(ctx: &AppContext) -> Vec<Reply> {
    vec![Reply::Text(texts::user_count(ctx.user_count().await))]
}

/// Fields of an `/add` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewModel {
    pub name: String,
    pub description: String,
    pub image: String,
}

/// Split `/add` arguments on the literal `" | "`. Exactly three fields with a
/// non-empty name are accepted.
pub fn parse_add_args(args: &str) -> Option<NewModel> {
    let fields: Vec<&str> = args.trim().split(" | ").collect();
    let [name, description, image] = fields.as_slice() else {
        return None;
    };
    if name.trim().is_empty() {
        return None;
    }
    Some(NewModel {
        name: name.to_string(),
        description: description.to_string(),
        image: image.to_string(),
    })
}

pub(super) async fn add(ctx: &AppContext, args: &str) -> Result<Vec<Reply>, AppError> {
    let Some(new) = parse_add_args(args) else {
        return Ok(vec![Reply::text(texts::ADD_USAGE)]);
    };

    let store = ctx.store();
    let _guard = store.write_lock().await;

    let mut models = store.load()?;
    models.insert(
        new.name.clone(),
        ModelRecord {
            description: new.description,
            image: Some(new.image).filter(|image| !image.is_empty()),
        },
    );
    store.save(&models)?;

    debug!(model = %new.name, total = models.len(), "model stored");
    Ok(vec![Reply::Text(texts::model_added(&new.name))])
}
