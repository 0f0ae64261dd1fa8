//! Human-readable preview of what a script will do, shown before the user
//! confirms a run.

use crate::markup::ansi;
use crate::script::{Module, ScriptDefinition};
use std::fmt::Write;

fn paint(color: bool, code: &str, text: &str) -> String {
    if color {
        format!("{code}{text}{}", ansi::RESET)
    } else {
        text.to_string()
    }
}

/// Render the plan for `script`. The password is never shown.
pub fn render_plan(script: &ScriptDefinition, color: bool) -> String {
    let login = &script.login;
    let mut out = String::new();
    let _ = writeln!(
        out,
        "login to {} with RCON port {} (password: {})",
        paint(color, ansi::CYAN, &format!("{}:{}", login.host, login.game_port)),
        paint(color, ansi::CYAN, &login.rcon_port.to_string()),
        "*".repeat(login.password.chars().count().clamp(1, 8))
    );

    if script.loops.is_empty() {
        out.push_str("script has no loops\n");
        return out;
    }

    for function in &script.loops {
        let _ = writeln!(
            out,
            "loop {} runs {} time(s)",
            paint(color, ansi::GREEN, &function.name),
            paint(color, ansi::YELLOW, &function.repeat_count.to_string())
        );
        if function.modules.is_empty() {
            let _ = writeln!(out, "  (no modules, will be skipped)");
            continue;
        }

        let flow: Vec<String> = function
            .modules
            .iter()
            .map(|module| match module {
                Module::Exec(exec) => exec.name.clone(),
                Module::Wait(wait) => format!("wait {}s", wait.seconds),
            })
            .collect();
        let execs = function
            .modules
            .iter()
            .filter(|m| matches!(m, Module::Exec(_)))
            .count();
        let _ = writeln!(
            out,
            "  {execs} module(s), {} wait(s): {}",
            function.modules.len() - execs,
            paint(color, ansi::PURPLE, &flow.join(" -> "))
        );

        for module in &function.modules {
            if let Module::Exec(exec) = module {
                let _ = writeln!(out, "  {} sends {} command(s):", exec.name, exec.len());
                for command in &exec.commands {
                    let _ = writeln!(out, "    \"{command}\"");
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_str;

    #[test]
    fn test_plan_lists_flow_and_commands() {
        let script = parse_str(
            r#"LOGIN mc.example.org:25565
RCONCFG[PORT=25575,PWD=abc]
LOOP main(freq=2) {
    EXEC greet { "say hi" }
    WAIT 1
    EXEC check {
        list
        time query daytime
    }
}
LOOP idle(freq=1) {}
"#,
        )
        .unwrap();
        let plan = render_plan(&script, false);
        assert_eq!(
            plan,
            "login to mc.example.org:25565 with RCON port 25575 (password: ***)\n\
             loop main runs 2 time(s)\n\
             \x20 2 module(s), 1 wait(s): greet -> wait 1s -> check\n\
             \x20 greet sends 1 command(s):\n\
             \x20   \"say hi\"\n\
             \x20 check sends 2 command(s):\n\
             \x20   \"list\"\n\
             \x20   \"time query daytime\"\n\
             loop idle runs 1 time(s)\n\
             \x20 (no modules, will be skipped)\n"
        );
        assert!(!plan.contains("abc"));
    }

    #[test]
    fn test_plan_without_loops() {
        let script = parse_str("LOGIN h:1\nRCONCFG[PORT=2,PWD=p]").unwrap();
        assert!(render_plan(&script, true).ends_with("script has no loops\n"));
    }
}
