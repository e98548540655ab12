// storefront/src/notifications/mod.rs

//! Notification creation: `resolve_recipient → render → suppress_duplicate → insert`.

pub mod events;
pub mod templates;

pub use events::{NotificationEvent, OrderContext};
pub use templates::{render, Audience, RenderedNotification};

use crate::clock::Clock;
use crate::errors::{AppError, Result as AppResult};
use crate::models::{CreateNotification, CreatedNotification, NewNotification, Notification, Recipient};
use crate::services::NotificationStore;
use chrono::Duration as ChronoDuration;
use iduka_flow::{ContextData, FlowRegistry, Pipeline, PipelineControl, PipelineResult};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};
use uuid::Uuid;

pub struct NotifyDeps {
  pub store: Arc<dyn NotificationStore>,
  pub clock: Arc<dyn Clock>,
  pub dedupe_window: Duration,
}

pub struct NotifyContext {
  pub deps: Arc<NotifyDeps>,
  pub request: CreateNotification,
  pub recipient: Option<Recipient>,
  pub rendered: Option<NewNotification>,
  pub created: Option<CreatedNotification>,
}

async fn resolve_recipient(ctx: ContextData<NotifyContext>) -> AppResult<PipelineControl> {
  let recipient = {
    let c = ctx.read();
    let role = c.request.recipient_role.as_deref().map(str::trim).filter(|r| !r.is_empty());
    match (c.request.recipient_user_id, role) {
      (Some(id), None) => Recipient::User(id),
      (None, Some(role)) => Recipient::Role(role.to_ascii_lowercase()),
      (Some(_), Some(_)) => {
        return Err(AppError::Validation(
          "Give either recipient_user_id or recipient_role, not both".to_string(),
        ))
      }
      (None, None) => {
        return Err(AppError::Validation(
          "One of recipient_user_id or recipient_role is required".to_string(),
        ))
      }
    }
  };
  if ctx.read().request.kind.trim().is_empty() {
    return Err(AppError::Validation("Notification type is required".to_string()));
  }
  ctx.update(|c| c.recipient = Some(recipient));
  Ok(PipelineControl::Continue)
}

/// Explicit title and body win over the template.
async fn render_notification(ctx: ContextData<NotifyContext>) -> AppResult<PipelineControl> {
  ctx.update(|c| {
    let recipient = c
      .recipient
      .clone()
      .ok_or_else(|| AppError::Internal("recipient not resolved".to_string()))?;
    let template = render(
      &NotificationEvent::from_parts(&c.request.kind, &c.request.meta),
      Audience::of(&recipient),
    );
    let explicit = |v: &Option<String>| v.clone().filter(|s| !s.trim().is_empty());
    c.rendered = Some(NewNotification {
      recipient,
      kind: c.request.kind.clone(),
      title: explicit(&c.request.title).unwrap_or(template.title),
      body: explicit(&c.request.body).unwrap_or(template.body),
      meta: c.request.meta.clone(),
    });
    Ok(PipelineControl::Continue)
  })
}

async fn suppress_duplicate(ctx: ContextData<NotifyContext>) -> AppResult<PipelineControl> {
  let (deps, kind, recipient) = {
    let c = ctx.read();
    (Arc::clone(&c.deps), c.request.kind.clone(), c.recipient.clone())
  };
  let recipient = recipient.ok_or_else(|| AppError::Internal("recipient not resolved".to_string()))?;
  let window = ChronoDuration::from_std(deps.dedupe_window)
    .map_err(|e| AppError::Config(format!("dedupe window out of range: {e}")))?;
  let since = deps.clock.now() - window;

  match deps.store.find_recent(&kind, &recipient, since).await? {
    Some(existing) => {
      info!(%kind, %recipient, existing_id = %existing.id, "Duplicate notification suppressed.");
      ctx.update(|c| {
        c.created = Some(CreatedNotification {
          notification: existing,
          skipped_duplicate: true,
        })
      });
      Ok(PipelineControl::Stop)
    }
    None => Ok(PipelineControl::Continue),
  }
}

async fn insert(ctx: ContextData<NotifyContext>) -> AppResult<PipelineControl> {
  let (deps, rendered) = {
    let c = ctx.read();
    (Arc::clone(&c.deps), c.rendered.clone())
  };
  let rendered = rendered.ok_or_else(|| AppError::Internal("notification not rendered".to_string()))?;
  let stored = deps.store.insert(rendered, deps.clock.now()).await?;
  debug!(id = %stored.id, kind = %stored.kind, "Notification stored.");
  ctx.update(|c| {
    c.created = Some(CreatedNotification {
      notification: stored,
      skipped_duplicate: false,
    })
  });
  Ok(PipelineControl::Continue)
}

/// The `notify` pipeline.
pub fn build_notify_pipeline() -> Pipeline<NotifyContext, AppError> {
  let mut p = Pipeline::new(
    "notify",
    &[
      ("resolve_recipient", false, None),
      ("render", false, None),
      ("suppress_duplicate", false, None),
      ("insert", false, None),
    ],
  );
  p.on("resolve_recipient", resolve_recipient);
  p.on("render", render_notification);
  p.on("suppress_duplicate", suppress_duplicate);
  p.on("insert", insert);
  p
}

pub struct NotificationService {
  flows: Arc<FlowRegistry<AppError>>,
  deps: Arc<NotifyDeps>,
}

impl NotificationService {
  /// Registers the notify pipeline with `flows`.
  pub fn new(flows: Arc<FlowRegistry<AppError>>, deps: NotifyDeps) -> Self {
    flows.register(Arc::new(build_notify_pipeline()));
    Self {
      flows,
      deps: Arc::new(deps),
    }
  }

  #[instrument(name = "NotificationService::create", skip(self, request), fields(kind = %request.kind))]
  pub async fn create(&self, request: CreateNotification) -> AppResult<CreatedNotification> {
    let ctx = ContextData::new(NotifyContext {
      deps: Arc::clone(&self.deps),
      request,
      recipient: None,
      rendered: None,
      created: None,
    });
    let result = self.flows.run(ctx.clone()).await?;
    if let PipelineResult::Stopped { step } = &result {
      debug!(%step, "Notify flow stopped early.");
    }
    let created = ctx.write().created.take();
    created.ok_or_else(|| AppError::Internal("notify flow produced no notification".to_string()))
  }

  /// Everything addressed to `user_id` directly or to its role.
  pub async fn list_for(&self, user_id: Option<Uuid>, role: Option<&str>) -> AppResult<Vec<Notification>> {
    let mut recipients = Vec::new();
    if let Some(id) = user_id {
      recipients.push(Recipient::User(id));
    }
    if let Some(role) = role {
      recipients.push(Recipient::Role(role.to_ascii_lowercase()));
    }
    if recipients.is_empty() {
      return Ok(Vec::new());
    }
    self.deps.store.list_for_recipient(&recipients).await
  }

  /// Marks a notification read. Only its recipient may do that.
  pub async fn mark_read(&self, id: Uuid, user_id: Option<Uuid>, role: Option<&str>) -> AppResult<Notification> {
    let existing = self
      .deps
      .store
      .get(id)
      .await?
      .ok_or_else(|| AppError::NotFound(format!("Notification {id} not found")))?;
    let allowed = match existing.recipient() {
      Some(Recipient::User(owner)) => user_id == Some(owner),
      Some(Recipient::Role(r)) => role.is_some_and(|role| role.eq_ignore_ascii_case(&r)),
      None => false,
    };
    if !allowed {
      return Err(AppError::Forbidden("Not the recipient of this notification".to_string()));
    }
    self
      .deps
      .store
      .mark_read(id, self.deps.clock.now())
      .await?
      .ok_or_else(|| AppError::NotFound(format!("Notification {id} not found")))
  }
}
