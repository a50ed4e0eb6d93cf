//! `users` service
//!
//! Users keep a list of provider ids. Serialized users have that list
//! replaced by the provider entities themselves.

use svcrest::prelude::*;

pub const NAME: &str = "users";

pub fn descriptor(collection: Arc<dyn Collection>) -> ServiceDescriptor {
    let settings = ServiceSettings::new(NAME)
        .rest("users")
        .with_collection(collection)
        .with_prop_filter("id username email phone providers")
        .with_populate("providers", super::providers::NAME);

    ServiceDescriptor::new(settings)
        .action("find", find)
        .action("get", get)
        .action("create", create)
        .action("update", update)
        .action("remove", remove)
        .action("addProvider", add_provider)
        .action("removeProvider", remove_provider)
        .method("validateParams", validate_params)
        .on_init(init)
}

fn init<'a>(service: &'a Service, _ctx: &'a mut Context) -> BoxFuture<'a, ServiceResult<()>> {
    Box::pin(async move {
        if service.lookup_service(super::providers::NAME).is_none() {
            return Err(ServiceError::internal("users needs the providers service"));
        }
        Ok(())
    })
}

fn find(ctx: &mut Context) -> ActionFuture<'_> {
    Box::pin(async move {
        let service = ctx.service().clone();
        let options = ctx.apply_page_sort(FindOptions::default());
        let docs = service
            .require_collection()?
            .find(&json!({}), options)
            .await?;

        let json = service.serialize(Value::Array(docs), None);
        service.populate_related(json, None).await
    })
}

fn get(ctx: &mut Context) -> ActionFuture<'_> {
    Box::pin(async move { Ok(ctx.assert_entity_exists("UserNotFound")?.clone()) })
}

fn create(ctx: &mut Context) -> ActionFuture<'_> {
    Box::pin(async move {
        let service = ctx.service().clone();
        service.call_method("validateParams", ctx, json!(true)).await?;

        let user = json!({
            "username": lowercase(ctx.params.get("username")),
            "email": lowercase(ctx.params.get("email")),
            "phone": ctx.params.get("phone").cloned().unwrap_or(Value::Null),
            "providers": [],
        });
        let doc = service.require_collection()?.save(user).await?;

        let json = service.serialize(doc, None);
        service.populate_related(json, None).await
    })
}

fn update(ctx: &mut Context) -> ActionFuture<'_> {
    Box::pin(async move {
        ctx.assert_entity_exists("UserNotFound")?;
        let service = ctx.service().clone();
        service.call_method("validateParams", ctx, json!(false)).await?;

        let mut doc = load_user(&service, ctx).await?;
        for field in ["username", "email"] {
            if ctx.has_param(field) {
                doc[field] = lowercase(ctx.params.get(field));
            }
        }
        if let Some(phone) = ctx.params.get("phone").filter(|v| !v.is_null()) {
            doc["phone"] = phone.clone();
        }
        let doc = service.require_collection()?.save(doc).await?;

        let json = service.serialize(doc, None);
        service.populate_related(json, None).await
    })
}

fn remove(ctx: &mut Context) -> ActionFuture<'_> {
    Box::pin(async move {
        let model = ctx.assert_entity_exists("UserNotFound")?.clone();
        let service = ctx.service().clone();
        let id = ctx.model_id.clone().unwrap_or(Value::Null);

        service
            .require_collection()?
            .remove(&json!({ "id": id }))
            .await?;
        Ok(model)
    })
}

fn add_provider(ctx: &mut Context) -> ActionFuture<'_> {
    Box::pin(async move {
        ctx.assert_entity_exists("UserNotFound")?;
        let service = ctx.service().clone();

        let providers = ctx
            .lookup_service(super::providers::NAME)
            .ok_or_else(|| ServiceError::internal("providers service is not loaded"))?;
        let provider_id = ctx.params.get("providerId").cloned().unwrap_or(Value::Null);
        let Some(provider) = providers
            .require_collection()?
            .find_by_id(&provider_id)
            .await?
        else {
            return ctx.fail_bad_request(ErrorKind::InvalidId, "ProviderNotFound");
        };
        let provider_id = provider.get("id").cloned().unwrap_or(provider_id);

        let mut doc = load_user(&service, ctx).await?;
        let linked = provider_list(&mut doc)?;
        if linked.iter().any(|id| same_id(id, &provider_id)) {
            return ctx.fail_bad_request(ErrorKind::AlreadyExists, "YouHaveAlreadyThisProvider");
        }
        linked.push(provider_id);
        let doc = service.require_collection()?.save(doc).await?;

        let json = service.serialize(doc, None);
        service.populate_related(json, None).await
    })
}

fn remove_provider(ctx: &mut Context) -> ActionFuture<'_> {
    Box::pin(async move {
        ctx.assert_entity_exists("UserNotFound")?;
        let service = ctx.service().clone();
        let provider_id = ctx.params.get("providerId").cloned().unwrap_or(Value::Null);

        let mut doc = load_user(&service, ctx).await?;
        let linked = provider_list(&mut doc)?;
        let before = linked.len();
        linked.retain(|id| !same_id(id, &provider_id));
        if linked.len() == before {
            return ctx.fail_bad_request(ErrorKind::InvalidId, "ProviderNotLinked");
        }
        let doc = service.require_collection()?.save(doc).await?;

        let json = service.serialize(doc, None);
        service.populate_related(json, None).await
    })
}

/// `create` passes `true`: the username is then required even when absent
fn validate_params<'a>(_service: &'a Service, ctx: &'a mut Context, strict: Value) -> ActionFuture<'a> {
    Box::pin(async move {
        if strict.as_bool().unwrap_or(false) || ctx.has_param("username") {
            ctx.validate("username")
                .trim()
                .not_empty(Some("UserNameCannotBeEmpty"))
                .end();
        }
        if ctx.has_param("email") {
            ctx.validate("email").trim().end();
        }
        ctx.validate("phone").is_number(Some("PhoneMustBeANumber")).end();

        ctx.ensure_valid()?;
        Ok(Value::Null)
    })
}

/// The stored (unserialized) record of the resolved user
async fn load_user(service: &Service, ctx: &Context) -> ServiceResult<Value> {
    let id = ctx.model_id.clone().unwrap_or(Value::Null);
    service
        .require_collection()?
        .find_by_id(&id)
        .await?
        .ok_or_else(|| ServiceError::model_not_found("UserNotFound"))
}

fn provider_list(doc: &mut Value) -> ServiceResult<&mut Vec<Value>> {
    let record = doc
        .as_object_mut()
        .ok_or_else(|| ServiceError::internal("stored user is not an object"))?;
    let field = record
        .entry("providers")
        .or_insert_with(|| Value::Array(Vec::new()));
    if !field.is_array() {
        *field = Value::Array(Vec::new());
    }
    field
        .as_array_mut()
        .ok_or_else(|| ServiceError::internal("providers is not a list"))
}

fn lowercase(value: Option<&Value>) -> Value {
    match value {
        Some(Value::String(s)) => Value::String(s.to_lowercase()),
        Some(other) => other.clone(),
        None => Value::Null,
    }
}

/// Ids compare by their string form, so `1` and `"1"` are the same provider
fn same_id(a: &Value, b: &Value) -> bool {
    fn key(v: &Value) -> Option<String> {
        match v {
            Value::Number(n) => Some(n.to_string()),
            Value::String(s) => Some(s.clone()),
            _ => None,
        }
    }
    a == b || matches!((key(a), key(b)), (Some(x), Some(y)) if x == y)
}
