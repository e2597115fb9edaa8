use tagwright::Config;

pub fn render_status(config: &Config) -> String {
    let guardrail = &config.guardrail;
    let routing = &config.routing;

    let mut lines = vec![
        "◆ tagwright status".to_string(),
        String::new(),
        format!("Version     {}", env!("CARGO_PKG_VERSION")),
        format!("Config      {}", config.config_path.display()),
        format!("Database    {}", config.database_path().display()),
        format!("Log level   {}", config.log_level),
        String::new(),
        "Guardrails".to_string(),
        format!("  monitor            {}", guardrail.monitor),
        format!(
            "  budgets            corrections={}, continuations={}, auto_fix_rounds={}",
            guardrail.max_correction_attempts,
            guardrail.max_continuation_attempts,
            guardrail.max_auto_fix_rounds
        ),
        format!("  final gate         {}", if guardrail.final_gate { "on" } else { "off" }),
        format!("  snapshot interval  {}ms", guardrail.snapshot_interval_ms),
        format!("  router timeout     {}ms", guardrail.router_timeout_ms),
        String::new(),
        "Routing".to_string(),
        format!("  default model      {}", routing.default_model),
        format!("  router model       {}", routing.router_model),
        format!(
            "  debugging model    {}",
            routing.debugging_model.as_deref().unwrap_or("(unset)")
        ),
        format!("  precedence         {}", routing.precedence),
    ];

    for (task, model) in &routing.task_models {
        lines.push(format!("  task {task:<13} {model}"));
    }

    lines.join("\n")
}
