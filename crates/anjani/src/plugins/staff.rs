use std::sync::Arc;

use async_trait::async_trait;

use anjani_core::{
    domain::UserId,
    plugin::{CommandContext, CommandHandler, Plugin, Registrar},
    state::StaffRoster,
    Result,
};

pub struct Staff;

impl Plugin for Staff {
    fn name(&self) -> &'static str {
        "staff"
    }

    fn register(&self, registrar: &mut Registrar) -> Result<()> {
        registrar.command("staff", Arc::new(StaffCommand))
    }
}

struct StaffCommand;

#[async_trait]
impl CommandHandler for StaffCommand {
    async fn handle(&self, ctx: CommandContext) -> Result<Option<String>> {
        Ok(Some(render(&ctx.state.staff().await)))
    }
}

fn render(staff: &StaffRoster) -> String {
    fn ids(users: &[UserId]) -> String {
        if users.is_empty() {
            return "-".to_string();
        }
        users
            .iter()
            .map(|u| u.0.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }

    let owner = if staff.owner.0 == 0 {
        "-".to_string()
    } else {
        staff.owner.0.to_string()
    };
    format!(
        "Owner: {owner}\nDevs: {}\nSudos: {}",
        ids(&staff.dev),
        ids(&staff.sudo)
    )
}
