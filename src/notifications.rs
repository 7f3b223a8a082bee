use tracing::warn;

pub fn notify_level_up(subject: &str, new_level: u32) {
    let title = format!("🎉 Level Up! Level {}", new_level);
    let body = format!("You reached level {} in {}. Keep questing!", new_level, subject);

    if let Err(e) = notify_rust::Notification::new()
        .summary(&title)
        .body(&body)
        .appname("Quizzy")
        .timeout(8000)
        .show()
    {
        warn!("failed to send level-up notification: {}", e);
    }
}

pub fn notify_quest_complete(xp: u64, credits: u64) {
    let body = format!("Correct! +{} XP, +{} credits", xp, credits);

    if let Err(e) = notify_rust::Notification::new()
        .summary("⭐ Quest Complete!")
        .body(&body)
        .appname("Quizzy")
        .timeout(5000)
        .show()
    {
        warn!("failed to send notification: {}", e);
    }
}
