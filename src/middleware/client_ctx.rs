use crate::auth::{AuthError, AuthUser, JwtKeys};
use crate::web::error::ApiError;
use actix_web::dev::{self, Extensions, Payload, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::header::AUTHORIZATION;
use actix_web::{web::Data, Error, FromRequest, HttpMessage, HttpRequest};
use futures::future::{err, ready, LocalBoxFuture, Ready};
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Client data stored for a single request cycle.
#[derive(Clone, Debug)]
pub struct ClientCtxInner {
    /// Decoded bearer token. None is a guest.
    pub client: Option<AuthUser>,
    /// Why a presented token was rejected, if one was.
    pub token_error: Option<AuthError>,
    /// Time the request started for processing time reporting.
    pub request_start: Instant,
}

impl Default for ClientCtxInner {
    fn default() -> Self {
        Self {
            client: None,
            token_error: None,
            request_start: Instant::now(),
        }
    }
}

impl ClientCtxInner {
    pub fn from_request(req: &HttpRequest, keys: &JwtKeys) -> Self {
        let header = req
            .headers()
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok());

        match header {
            None => Self::default(),
            Some(header) => match keys.authenticate(Some(header)) {
                Ok(user) => Self {
                    client: Some(user),
                    ..Default::default()
                },
                Err(e) => {
                    log::debug!("Rejected bearer token: {}", e);
                    Self {
                        token_error: Some(e),
                        ..Default::default()
                    }
                }
            },
        }
    }
}

/// Client context passed to routes.
/// Wraps ClientCtxInner, which is set at the beginning of the request.
#[derive(Clone, Debug)]
pub struct ClientCtx(Data<ClientCtxInner>);

impl Default for ClientCtx {
    fn default() -> Self {
        Self(Data::new(ClientCtxInner::default()))
    }
}

impl ClientCtx {
    pub fn get_or_insert_from_extensions(
        extensions: &mut Extensions,
        req: &HttpRequest,
        keys: &JwtKeys,
    ) -> Self {
        match extensions.get::<Data<ClientCtxInner>>() {
            Some(cbox) => Self(cbox.clone()),
            None => {
                let cbox = Data::new(ClientCtxInner::from_request(req, keys));
                extensions.insert(cbox.clone());
                Self(cbox)
            }
        }
    }

    /// Returns either the user's id or None.
    pub fn get_id(&self) -> Option<i32> {
        self.0.client.as_ref().map(|u| u.id)
    }

    pub fn get_user(&self) -> Option<&AuthUser> {
        self.0.client.as_ref()
    }

    pub fn is_user(&self) -> bool {
        self.0.client.is_some()
    }

    pub fn can(&self, permission: &str) -> bool {
        self.0
            .client
            .as_ref()
            .map(|u| u.can(permission))
            .unwrap_or(false)
    }

    /// Returns Duration representing request time.
    pub fn request_time(&self) -> Duration {
        Instant::now() - self.0.request_start
    }

    /// Returns human readable representing request time.
    pub fn request_time_as_string(&self) -> String {
        let us = self.request_time().as_micros();
        if us > 5000 {
            format!("{}ms", us / 1000)
        } else {
            format!("{}μs", us)
        }
    }

    /// Require a valid token. Returns the caller or 401.
    pub fn require_login(&self) -> Result<&AuthUser, ApiError> {
        match (&self.0.client, &self.0.token_error) {
            (Some(user), _) => Ok(user),
            (None, Some(e)) => Err(e.clone().into()),
            (None, None) => Err(AuthError::MissingToken.into()),
        }
    }

    /// Require specific permission. 401 for guests, 403 otherwise.
    pub fn require_permission(&self, permission: &str) -> Result<&AuthUser, ApiError> {
        let user = self.require_login()?;
        if !user.can(permission) {
            return Err(ApiError::forbidden("Insufficient permissions"));
        }
        Ok(user)
    }

    /// Owner of the resource, or holder of the permission.
    pub fn can_modify(&self, resource_user_id: i32, permission: &str) -> bool {
        self.get_id() == Some(resource_user_id) || self.can(permission)
    }
}

fn keys_missing() -> Error {
    log::error!("JwtKeys are not registered as app data.");
    ApiError::internal("JwtKeys are not registered as app data").into()
}

/// This implementation is what actually provides the `client: ClientCtx` in the parameters of route functions.
impl FromRequest for ClientCtx {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        match req.app_data::<Data<JwtKeys>>() {
            Some(keys) => ready(Ok(ClientCtx::get_or_insert_from_extensions(
                &mut req.extensions_mut(),
                req,
                keys,
            ))),
            None => err(keys_missing()),
        }
    }
}

/// Routes that take `AuthUser` reject guests with 401 before the handler runs.
impl FromRequest for AuthUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let ctx = match ClientCtx::from_request(req, payload).into_inner() {
            Ok(ctx) => ctx,
            Err(e) => return err(e),
        };

        ready(
            ctx.require_login()
                .map(AuthUser::clone)
                .map_err(Error::from),
        )
    }
}

impl<S: 'static, B> Transform<S, ServiceRequest> for ClientCtx
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = ClientCtxMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(ClientCtxMiddleware {
            service: Rc::new(service),
        }))
    }
}

/// Decodes the bearer token once, before any extractor runs.
pub struct ClientCtxMiddleware<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for ClientCtxMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    dev::forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let svc = self.service.clone();

        if let Some(keys) = req.app_data::<Data<JwtKeys>>() {
            let inner = ClientCtxInner::from_request(req.request(), keys);
            req.extensions_mut().insert(Data::new(inner));
        }

        Box::pin(async move { svc.call(req).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orm::users::Role;
    use actix_web::test::TestRequest;

    fn keys() -> JwtKeys {
        JwtKeys::new(b"client-ctx-test-secret-0123456789", 1)
    }

    fn token(keys: &JwtKeys, role: Role) -> String {
        let now = chrono::Utc::now().naive_utc();
        keys.issue(&crate::orm::users::Model {
            id: 7,
            username: "ctx".to_string(),
            email: "ctx@example.com".to_string(),
            password: String::new(),
            role,
            display_name: None,
            bio: None,
            location: None,
            created_at: now,
            updated_at: now,
        })
        .unwrap()
    }

    #[test]
    fn test_guest_context() {
        let req = TestRequest::default().to_http_request();
        let inner = ClientCtxInner::from_request(&req, &keys());
        let ctx = ClientCtx(Data::new(inner));

        assert!(!ctx.is_user());
        assert_eq!(ctx.require_login().unwrap_err().public_message(), "Authentication required");
    }

    #[test]
    fn test_invalid_token_is_guest_with_error() {
        let req = TestRequest::default()
            .insert_header((AUTHORIZATION, "Bearer not.a.jwt"))
            .to_http_request();
        let ctx = ClientCtx(Data::new(ClientCtxInner::from_request(&req, &keys())));

        assert!(!ctx.is_user());
        assert_eq!(ctx.require_login().unwrap_err().public_message(), "Invalid token");
    }

    #[test]
    fn test_permission_checks() {
        let keys = keys();
        let citizen = TestRequest::default()
            .insert_header((AUTHORIZATION, format!("Bearer {}", token(&keys, Role::Citizen))))
            .to_http_request();
        let ctx = ClientCtx(Data::new(ClientCtxInner::from_request(&citizen, &keys)));

        assert_eq!(ctx.get_id(), Some(7));
        assert!(matches!(
            ctx.require_permission(crate::permission::ADMIN_DATA_MANAGE),
            Err(ApiError::Forbidden(_))
        ));
        assert!(ctx.can_modify(7, crate::permission::SOCIAL_MODERATE));
        assert!(!ctx.can_modify(8, crate::permission::SOCIAL_MODERATE));
    }
}
