//! Login, signup and logout flows.

use crate::client::ApiClient;
use crate::navigation::Route;
use crate::{Credentials, NovoUsuario, Result};

pub const LOGIN_FAILED_ALERT: &str = "Erro ao fazer login. Verifique as credenciais.";
pub const SIGNUP_FAILED_ALERT: &str =
    "Erro ao realizar o cadastro. Verifique os dados e tente novamente.";

/// Exchange credentials for a token, store it and go home
pub fn login(api: &ApiClient, credentials: &Credentials) -> Result<()> {
    let token = match api.login(credentials) {
        Ok(token) => token,
        Err(e) => {
            tracing::error!("Erro ao realizar login: {}", e);
            api.navigator().alert(LOGIN_FAILED_ALERT);
            return Err(e);
        }
    };

    api.tokens().save(&token)?;
    tracing::info!("Login bem-sucedido para {}", credentials.email);
    api.navigator().navigate(Route::Home);
    Ok(())
}

/// Create an account, then send the user to login
pub fn signup(api: &ApiClient, novo: &NovoUsuario) -> Result<()> {
    if let Err(e) = api.signup(novo) {
        tracing::error!("Erro ao realizar cadastro: {}", e);
        api.navigator().alert(SIGNUP_FAILED_ALERT);
        return Err(e);
    }
    tracing::info!("Cadastro bem-sucedido para {}", novo.email);
    api.navigator().navigate(Route::Login);
    Ok(())
}

/// End the session on the server, then forget the token locally
///
/// The local token is cleared even when the server call fails.
pub fn logout(api: &ApiClient) -> Result<()> {
    if api.tokens().load().is_some() {
        if let Err(e) = api.logout() {
            tracing::warn!("Logout no servidor falhou: {}", e);
        }
    }
    api.tokens().clear()?;
    api.navigator().navigate(Route::Login);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing::Harness;
    use crate::transport::Method;
    use chrono::NaiveDate;
    use serde_json::json;

    fn credentials() -> Credentials {
        Credentials {
            email: "a@b.com".into(),
            senha: "x".into(),
        }
    }

    #[test]
    fn test_login_stores_token_and_goes_home() {
        let h = Harness::new(None);
        h.transport.on(Method::Post, "/login", 200, json!({ "token": "abc" }));

        login(&h.api, &credentials()).unwrap();

        assert_eq!(h.api.tokens().load(), Some("abc".into()));
        assert_eq!(h.navigator.current(), Route::Home);
    }

    #[test]
    fn test_failed_login_alerts_and_stays() {
        let h = Harness::new(None);
        h.transport.on(Method::Post, "/login", 400, json!({ "message": "Senha incorreta" }));

        assert!(login(&h.api, &credentials()).is_err());

        assert_eq!(h.api.tokens().load(), None);
        assert_eq!(h.navigator.take_alerts(), vec![LOGIN_FAILED_ALERT.to_string()]);
        assert!(h.navigator.visited().is_empty());
    }

    #[test]
    fn test_signup_goes_to_login() {
        let h = Harness::new(None);
        h.transport.on(Method::Post, "/usuario", 201, json!({ "id": 8 }));

        let novo = NovoUsuario {
            nome: "Maria".into(),
            email: "m@x.com".into(),
            senha: "segredo".into(),
            data: NaiveDate::from_ymd_opt(1948, 3, 2).unwrap(),
        };
        signup(&h.api, &novo).unwrap();

        assert_eq!(h.navigator.current(), Route::Login);
        assert_eq!(h.transport.requests()[0].body.as_ref().unwrap()["data"], "1948-03-02");
    }

    #[test]
    fn test_logout_clears_token_even_when_server_fails() {
        let h = Harness::logged_in();
        h.transport.on(Method::Post, "/logout", 500, json!({}));

        logout(&h.api).unwrap();

        assert_eq!(h.api.tokens().load(), None);
        assert_eq!(h.navigator.current(), Route::Login);
    }

    #[test]
    fn test_logout_without_session_skips_server() {
        let h = Harness::new(None);
        logout(&h.api).unwrap();
        assert!(h.transport.requests().is_empty());
    }
}
