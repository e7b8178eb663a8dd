//! Session establishment for a tenant/build identity.

use tracing::{error, info};

use crate::transport::{Session, Transport};

/// Who this run is, as far as the backend is concerned.
///
/// The build identifier doubles as the stable client identity used to log
/// in and as the correlation key sent with every remote call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub tenant_id: String,
    pub build_identifier: String,
}

impl Identity {
    pub fn new(tenant_id: impl Into<String>, build_identifier: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            build_identifier: build_identifier.into(),
        }
    }
}

/// Logs in to the backend as `identity`.
///
/// The identity is created server-side if it does not exist. Returns `None`
/// if the transport reports an error or the returned session is not active.
/// Failures are logged here; callers only need to check the result.
pub async fn establish<T>(transport: &T, identity: &Identity) -> Option<Session>
where
    T: Transport + ?Sized,
{
    info!(
        "Logging in to {} as {} via {}",
        identity.tenant_id,
        identity.build_identifier,
        transport.name()
    );

    match transport
        .login(&identity.tenant_id, &identity.build_identifier)
        .await
    {
        Ok(session) if session.is_active() => {
            if session.newly_created() {
                info!("Created new identity {}", identity.build_identifier);
            }
            info!("Logged in to {}", identity.tenant_id);
            Some(session)
        }
        Ok(_) => {
            error!(
                "Failed to log in to {} as {}: no active session after login",
                identity.tenant_id, identity.build_identifier
            );
            None
        }
        Err(e) => {
            error!(
                "Failed to log in to {} as {}: {}",
                identity.tenant_id,
                identity.build_identifier,
                e.report()
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::ApiError;
    use crate::transport::testing::ScriptedTransport;

    #[tokio::test]
    async fn test_establish_success() {
        let transport = ScriptedTransport::new();
        let identity = Identity::new("6195", "jenkins-42");

        let session = establish(&transport, &identity).await;

        assert!(session.is_some_and(|s| s.is_active()));
        assert_eq!(
            transport.logins(),
            vec![("6195".to_string(), "jenkins-42".to_string())]
        );
    }

    #[tokio::test]
    async fn test_establish_inactive_session() {
        let transport = ScriptedTransport::new().with_login(Ok(Session::inactive()));

        let session = establish(&transport, &Identity::new("6195", "jenkins-42")).await;

        assert!(session.is_none());
        assert_eq!(transport.login_count(), 1);
    }

    #[tokio::test]
    async fn test_establish_transport_error() {
        let transport = ScriptedTransport::new().with_login(Err(ApiError {
            code: 400,
            error: "InvalidTitleId".to_string(),
            error_message: "Invalid title id".to_string(),
            ..Default::default()
        }));

        let session = establish(&transport, &Identity::new("nope", "jenkins-42")).await;

        assert!(session.is_none());
        assert_eq!(transport.call_count(), 0);
    }
}
