mod support;

use predicates::str::contains;

use support::TestEnv;

const EMAIL: &str = "ayse@example.com";
const PASSWORD: &str = "secret1";

fn register(env: &TestEnv) -> Result<String, Box<dyn std::error::Error>> {
    let value = env.json(&["auth", "register", "Ayşe", EMAIL, "--password", PASSWORD])?;
    assert_eq!(value["data"]["user"]["email"], EMAIL);
    assert_eq!(value["data"]["user"]["is_verified"], false);
    assert!(value["data"]["user"].get("password").is_none());
    assert_eq!(value["data"]["verification_mail"]["success"], true);

    let users = env.read_slot("users")?;
    Ok(users[0]["verificationToken"]
        .as_str()
        .unwrap_or_default()
        .to_string())
}

#[test]
fn protected_commands_need_a_session() -> Result<(), Box<dyn std::error::Error>> {
    let env = TestEnv::bare()?;
    let error = env.json_failure(&["task", "list"], 3)?;
    assert_eq!(error["error"]["kind"], "rejected");
    assert_eq!(error["next_steps"][0], "dayplan auth login <email>");

    env.cmd().args(["view", "weekly"]).assert().code(3);
    env.cmd().args(["topic", "list"]).assert().code(3);
    Ok(())
}

#[test]
fn register_verify_login_logout() -> Result<(), Box<dyn std::error::Error>> {
    let env = TestEnv::bare()?;
    let token = register(&env)?;
    assert!(!token.is_empty());

    let outbox = env.outbox()?;
    assert_eq!(outbox.len(), 1);
    assert_eq!(outbox[0]["subject"], "Email Adresinizi Doğrulayın");
    let html = outbox[0]["html"].as_str().unwrap_or_default();
    assert!(html.contains(&format!("http://localhost:3000/verify?token={token}")));

    let users = env.read_slot("users")?;
    let stored = users[0]["password"].as_str().unwrap_or_default();
    assert!(stored.starts_with("blake3$"));
    assert!(!stored.contains(PASSWORD));

    env.cmd()
        .args(["auth", "login", EMAIL, "--password", PASSWORD])
        .assert()
        .code(3)
        .stderr(contains("not verified"));

    let verified = env.json(&["auth", "verify", &token])?;
    assert_eq!(verified["data"]["user"]["is_verified"], true);
    assert!(verified["data"].get("admin_notice").is_none());

    env.cmd()
        .args(["auth", "verify", &token])
        .assert()
        .code(3);

    env.cmd()
        .args(["auth", "login", EMAIL, "--password", "wrong-password"])
        .assert()
        .code(3);

    let login = env.json(&["auth", "login", EMAIL, "--password", PASSWORD])?;
    assert_eq!(login["data"]["isAuthenticated"], true);
    assert_eq!(login["data"]["name"], "Ayşe");

    env.json(&["task", "add", "After login"])?;
    let whoami = env.json(&["auth", "whoami"])?;
    assert_eq!(whoami["data"]["email"], EMAIL);

    let logout = env.json(&["auth", "logout"])?;
    assert_eq!(logout["data"]["isAuthenticated"], false);
    env.cmd().args(["task", "list"]).assert().code(3);

    let whoami = env.json(&["auth", "whoami"])?;
    assert_eq!(whoami["data"]["isAuthenticated"], false);
    assert!(whoami["data"].get("email").is_none());
    Ok(())
}

#[test]
fn verify_notifies_the_admin_address() -> Result<(), Box<dyn std::error::Error>> {
    let env = TestEnv::bare()?;
    env.write_config("[mail]\nnotify_address = \"admin@example.com\"\n")?;
    let token = register(&env)?;

    let verified = env.json(&["auth", "verify", &token])?;
    assert_eq!(verified["data"]["admin_notice"]["success"], true);

    let outbox = env.outbox()?;
    assert_eq!(outbox.len(), 2);
    assert_eq!(outbox[1]["to"], "admin@example.com");
    assert_eq!(outbox[1]["subject"], "Yeni E-posta Doğrulaması");
    Ok(())
}

#[test]
fn registration_is_validated() -> Result<(), Box<dyn std::error::Error>> {
    let env = TestEnv::bare()?;
    env.cmd()
        .args(["auth", "register", "A", EMAIL, "--password", PASSWORD])
        .assert()
        .code(2);
    env.cmd()
        .args(["auth", "register", "Ayşe", "not-an-email", "--password", PASSWORD])
        .assert()
        .code(2);
    env.cmd()
        .args(["auth", "register", "Ayşe", EMAIL, "--password", "short"])
        .assert()
        .code(2);
    env.cmd()
        .args([
            "auth",
            "register",
            "Ayşe",
            EMAIL,
            "--password",
            PASSWORD,
            "--confirm-password",
            "secret2",
        ])
        .assert()
        .code(2)
        .stderr(contains("passwords do not match"));

    register(&env)?;
    let error = env.json_failure(&["auth", "register", "Other", EMAIL, "--password", PASSWORD], 3)?;
    assert_eq!(error["error"]["details"]["email"], EMAIL);
    Ok(())
}

#[test]
fn guard_decisions_follow_the_session() -> Result<(), Box<dyn std::error::Error>> {
    let env = TestEnv::bare()?;
    let anonymous = env.json(&["guard", "/weekly"])?;
    assert_eq!(anonymous["data"]["decision"], "redirect");
    assert_eq!(anonymous["data"]["location"], "/login");
    assert_eq!(anonymous["data"]["has_session"], false);

    let public = env.json(&["guard", "/register"])?;
    assert_eq!(public["data"]["decision"], "allow");

    let token = register(&env)?;
    env.json(&["auth", "verify", &token])?;
    env.json(&["auth", "login", EMAIL, "--password", PASSWORD])?;

    let bounced = env.json(&["guard", "/login"])?;
    assert_eq!(bounced["data"]["decision"], "redirect");
    assert_eq!(bounced["data"]["location"], "/dashboard/01.06");

    let allowed = env.json(&["guard", "/monthly"])?;
    assert_eq!(allowed["data"]["decision"], "allow");
    Ok(())
}

#[test]
fn damaged_users_file_blocks_registration() -> Result<(), Box<dyn std::error::Error>> {
    let env = TestEnv::bare()?;
    std::fs::create_dir_all(env.data_dir())?;
    let users_path = env.data_dir().join("users.json");
    let damaged = r#"[{"id":"1","name":"Old","email":"old@b.co","password":"x"},]"#;
    std::fs::write(&users_path, damaged)?;

    let error = env.json_failure(&["auth", "register", "Ayşe", EMAIL, "--password", PASSWORD], 4)?;
    assert_eq!(error["error"]["kind"], "operation_failed");
    assert_eq!(std::fs::read_to_string(&users_path)?, damaged);
    assert!(env.outbox()?.is_empty());
    Ok(())
}
