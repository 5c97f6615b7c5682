#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use remeha_home::auth::endpoints::{CLIENT_ID, POLICY};
use remeha_home::config::Config;
use remeha_home::sync::client::{SUBSCRIPTION_KEY, SUBSCRIPTION_KEY_HEADER};
use serde_json::{Value, json};
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const EMAIL: &str = "user@example.com";
pub const PASSWORD: &str = "secret";
pub const TENANT: &str = "/tenant";

/// 2026-01-15 10:00:00 UTC
pub fn start_instant() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap()
}

pub fn config_for(server: &MockServer) -> Config {
    let mut config = Config::default();
    config.credentials.email = EMAIL.to_string();
    config.credentials.password = PASSWORD.to_string();
    config.endpoints.identity_base_url = format!("{}{}", server.uri(), TENANT);
    config.endpoints.api_base_url = format!("{}/api", server.uri());
    config.endpoints.http_timeout_secs = 5;
    config
}

pub fn self_asserted_path() -> String {
    format!("{}/{}/SelfAsserted", TENANT, POLICY)
}

pub fn confirmed_path() -> String {
    format!("{}/{}/api/CombinedSigninAndSignup/confirmed", TENANT, POLICY)
}

pub fn token_path() -> String {
    format!("{}/oauth2/v2.0/token", TENANT)
}

/// Step 1: request id `abc123` and CSRF cookie `csrf1`
pub async fn mount_authorize(server: &MockServer, expected: u64) {
    Mock::given(method("GET"))
        .and(path(format!("{}/oauth2/v2.0/authorize", TENANT)))
        .and(query_param("response_type", "code"))
        .and(query_param("client_id", CLIENT_ID))
        .and(query_param("code_challenge_method", "S256"))
        .and(query_param("p", POLICY))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-request-id", "abc123")
                .insert_header("set-cookie", "x-ms-cpim-csrf=csrf1; Path=/")
                .set_body_string("<html>login</html>"),
        )
        .expect(expected)
        .mount(server)
        .await;
}

pub async fn mount_self_asserted(server: &MockServer, body: Value, expected: u64) {
    Mock::given(method("POST"))
        .and(path(self_asserted_path()))
        .and(header("x-csrf-token", "csrf1"))
        .and(query_param("tx", "StateProperties=eyJUSUQiOiJhYmMxMjMifQ"))
        .and(query_param("p", POLICY))
        .and(body_string_contains("request_type=RESPONSE"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(expected)
        .mount(server)
        .await;
}

pub async fn mount_confirmed(server: &MockServer, location: &str, expected: u64) {
    Mock::given(method("GET"))
        .and(path(confirmed_path()))
        .and(query_param("csrf_token", "csrf1"))
        .and(query_param("rememberMe", "false"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", location))
        .expect(expected)
        .mount(server)
        .await;
}

pub async fn mount_code_exchange(server: &MockServer, response: ResponseTemplate, expected: u64) {
    Mock::given(method("POST"))
        .and(path(token_path()))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=XYZ"))
        .and(body_string_contains("code_verifier="))
        .respond_with(response)
        .expect(expected)
        .mount(server)
        .await;
}

/// All five steps succeed; the token expires `lifetime_secs` after `start_instant()`
pub async fn mount_login(server: &MockServer, expected_logins: u64, lifetime_secs: i64) {
    mount_authorize(server, expected_logins).await;
    mount_self_asserted(server, json!({"status": "200"}), expected_logins).await;
    mount_confirmed(
        server,
        "com.b2c.remehaapp://login-callback?state=s&code=XYZ",
        expected_logins,
    )
    .await;
    mount_code_exchange(
        server,
        ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "tok1",
            "token_type": "Bearer",
            "exp": start_instant().timestamp() + lifetime_secs,
        })),
        expected_logins,
    )
    .await;
}

pub fn dashboard_json(zone_mode: &str) -> Value {
    json!({
        "appliances": [{
            "applianceId": "app-1",
            "outdoorTemperature": null,
            "outdoorTemperatureInformation": {"cloudOutdoorTemperature": 6.5},
            "waterPressure": 1.8,
            "waterPressureOK": true,
            "gasCalorificValue": 9.8,
            "activeThermalMode": "Heating",
            "climateZones": [{
                "climateZoneId": "zone-1",
                "roomTemperature": 20.5,
                "setPoint": 21.0,
                "zoneMode": zone_mode,
                "activeHeatingClimateTimeProgramNumber": 2
            }],
            "hotWaterZones": [{"dhwTemperature": 52.0}]
        }]
    })
}

pub async fn mount_dashboard(server: &MockServer, body: Value, expected: u64) {
    Mock::given(method("GET"))
        .and(path("/api/homes/dashboard"))
        .and(header("authorization", "Bearer tok1"))
        .and(header(SUBSCRIPTION_KEY_HEADER, SUBSCRIPTION_KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(expected)
        .mount(server)
        .await;
}

/// Energy series for 2026-01-15: YTD 3.5/9.5 kWh, today 0.25/0.75 kWh
pub async fn mount_energy(server: &MockServer, expected: u64) {
    let series = [
        (
            "yearly",
            "1900-01-01T00:00:00.000Z",
            "2025-12-31T23:59:59.999Z",
            json!({"data": [
                {"heatingEnergyConsumed": 1.0, "heatingEnergyDelivered": 3.0},
                {"heatingEnergyConsumed": 2.0, "heatingEnergyDelivered": 5.0}
            ]}),
        ),
        (
            "monthly",
            "2026-01-01T00:00:00.000Z",
            "2026-01-31T23:59:59.999Z",
            json!({"data": [
                {"heatingEnergyConsumed": 0.5, "heatingEnergyDelivered": 1.5}
            ]}),
        ),
        (
            "daily",
            "2026-01-15T00:00:00.000Z",
            "2026-01-15T23:59:59.999Z",
            json!({"data": [
                {"heatingEnergyConsumed": 0.25, "heatingEnergyDelivered": 0.75},
                {"gasConsumed": 1.0}
            ]}),
        ),
    ];
    for (period, start, end, body) in series {
        Mock::given(method("GET"))
            .and(path(format!("/api/appliances/app-1/energyconsumption/{}", period)))
            .and(query_param("startDate", start))
            .and(query_param("endDate", end))
            .and(header(SUBSCRIPTION_KEY_HEADER, SUBSCRIPTION_KEY))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(expected)
            .mount(server)
            .await;
    }
}
