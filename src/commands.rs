use teloxide::utils::command::BotCommands;

pub const TEAMSPEAK_UNAVAILABLE: &str = "Could not reach the TeamSpeak server, try again later.";

#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "lowercase", description = "These commands are supported:")]
pub enum Command {
    #[command(description = "show this help")]
    Help,
    #[command(description = "show your user ID and this group's ID")]
    Whoami,
    #[command(description = "list users connected to TeamSpeak")]
    Ts,
    #[command(description = "post a user list that keeps itself up to date")]
    Tslive,
}

pub fn whoami_text(user_id: u64, chat_id: i64) -> String {
    format!("Your user ID is {user_id} and this group ID is {chat_id}")
}
