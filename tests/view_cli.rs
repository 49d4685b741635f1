mod support;

use serde_json::json;

use support::TestEnv;

fn add(env: &TestEnv, title: &str, date: &str, time: &str) -> Result<String, Box<dyn std::error::Error>> {
    let value = env.json(&["task", "add", title, "--date", date, "--time", time])?;
    Ok(value["data"]["task"]["id"]
        .as_str()
        .unwrap_or_default()
        .to_string())
}

#[test]
fn slots_lists_the_fixed_grid() -> Result<(), Box<dyn std::error::Error>> {
    let env = TestEnv::bare()?;
    let value = env.json(&["slots"])?;
    let slots = value["data"]["slots"].as_array().cloned().unwrap_or_default();
    assert_eq!(slots.len(), 24);
    assert_eq!(slots[0], "01:00");
    assert_eq!(slots[23], "06:45");
    Ok(())
}

#[test]
fn daily_and_slot_views() -> Result<(), Box<dyn std::error::Error>> {
    let env = TestEnv::new()?;
    add(&env, "Early", "01.06", "01:30")?;
    add(&env, "Later", "01.06", "07:00")?;
    add(&env, "Tomorrow", "02.06", "01:30")?;

    let daily = env.json(&["view", "daily"])?;
    assert_eq!(daily["data"]["date"], "01.06");
    assert_eq!(daily["data"]["total"], 2);

    let slots = env.json(&["view", "slots", "01.06"])?;
    assert_eq!(
        slots["data"]["slots"],
        json!([{ "time": "01:30", "tasks": [daily["data"]["tasks"][0].clone()] }])
    );
    Ok(())
}

#[test]
fn weekly_view_starts_on_monday_by_default() -> Result<(), Box<dyn std::error::Error>> {
    let env = TestEnv::new()?;
    add(&env, "Sunday task", "01.06", "02:00")?;

    let week = env.json(&["view", "weekly"])?;
    assert_eq!(week["data"]["week_start"], "2025-05-26");
    let days = week["data"]["days"].as_array().cloned().unwrap_or_default();
    assert_eq!(days.len(), 7);
    assert_eq!(days[0]["date"], "26.05");
    assert_eq!(days[0]["weekday"], "Pazartesi");
    assert_eq!(days[6]["date"], "01.06");
    assert_eq!(days[6]["weekday"], "Pazar");
    assert_eq!(days[6]["tasks"][0]["title"], "Sunday task");
    Ok(())
}

#[test]
fn weekly_view_honours_sunday_start() -> Result<(), Box<dyn std::error::Error>> {
    let env = TestEnv::new()?;
    env.write_config("[auth]\nrequire_login = false\n\n[views]\nweek_start = \"sunday\"\n")?;

    let week = env.json(&["view", "weekly", "04.06"])?;
    assert_eq!(week["data"]["week_start"], "2025-06-01");
    assert_eq!(week["data"]["days"][0]["weekday"], "Pazar");
    Ok(())
}

#[test]
fn monthly_view_counts_completion() -> Result<(), Box<dyn std::error::Error>> {
    let env = TestEnv::new()?;
    let done = add(&env, "A", "01.06", "01:00")?;
    let failed = add(&env, "B", "01.06", "01:15")?;
    add(&env, "C", "15.06", "01:15")?;
    env.cmd().args(["task", "done", &done]).assert().success();
    env.cmd().args(["task", "fail", &failed]).assert().success();

    let month = env.json(&["view", "monthly"])?;
    assert_eq!(month["data"]["year"], 2025);
    assert_eq!(month["data"]["month"], 6);
    assert_eq!(
        month["data"]["grid"],
        json!({ "leadingBlanks": 6, "days": 30, "trailingBlanks": 6 })
    );
    let days = month["data"]["days"].as_array().cloned().unwrap_or_default();
    assert_eq!(days.len(), 30);
    assert_eq!(days[0]["completed"], 1);
    assert_eq!(days[0]["failed"], 1);
    assert_eq!(days[0]["completionRate"], 50);
    assert_eq!(days[1]["completionRate"], serde_json::Value::Null);
    assert_eq!(days[14]["pending"], 1);
    Ok(())
}

#[test]
fn stats_group_by_status_type_and_day() -> Result<(), Box<dyn std::error::Error>> {
    let env = TestEnv::new()?;
    add(&env, "A", "03.06", "01:00")?;
    add(&env, "B", "01.06", "01:00")?;
    env.json(&["task", "add", "C", "--date", "01.06", "--type", "software"])?;
    add(&env, "July", "01.07", "01:00")?;

    let stats = env.json(&["view", "stats", "--month", "6"])?;
    let data = &stats["data"];
    assert_eq!(data["total"], 3);
    assert_eq!(data["status"]["pending"], 3);
    assert_eq!(
        data["byType"],
        json!([
            { "type": "Okul Dersi", "count": 2 },
            { "type": "Yazılım", "count": 1 }
        ])
    );
    assert_eq!(
        data["byDay"],
        json!([
            { "date": "01.06", "count": 2 },
            { "date": "03.06", "count": 1 }
        ])
    );
    Ok(())
}

#[test]
fn invalid_month_is_user_error() -> Result<(), Box<dyn std::error::Error>> {
    let env = TestEnv::new()?;
    env.cmd()
        .args(["view", "monthly", "--month", "13"])
        .assert()
        .code(2);
    Ok(())
}
