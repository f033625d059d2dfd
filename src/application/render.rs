#[cfg(test)]
#[path = "render_test.rs"]
mod tests;

use chrono::DateTime;
use chrono::Utc;
use yansi::Paint;

use crate::domain::models::FeedItem;
use crate::domain::models::User;

pub fn format_publish_date(date: &DateTime<Utc>) -> String {
    return date.format("%B %-d, %Y").to_string();
}

pub fn format_member_since(date: &DateTime<Utc>) -> String {
    return date.format("%B %Y").to_string();
}

pub fn format_books_count(count: usize) -> String {
    if count == 1 {
        return "1 book".to_string();
    }
    return format!("{count} books");
}

pub fn format_item(item: &FeedItem) -> String {
    return [
        Paint::new(&item.author.username).bold().to_string(),
        format!("{}  {}", item.title, Paint::yellow(item.rating.stars())),
        item.caption.to_string(),
        Paint::new(format!("Shared on {}", format_publish_date(&item.created_at)))
            .dimmed()
            .to_string(),
    ]
    .join("\n");
}

/// Renders a list of items separated by blank lines. Items shared by the user
/// get their id appended so they can be passed to `delete`.
pub fn format_items(items: &[FeedItem], with_ids: bool) -> String {
    if items.is_empty() {
        return "No recommendations yet.".to_string();
    }

    return items
        .iter()
        .map(|item| {
            let res = format_item(item);
            if with_ids {
                return format!("{res}\nID: {}", item.id);
            }
            return res;
        })
        .collect::<Vec<String>>()
        .join("\n\n");
}

pub fn format_profile(user: &User) -> String {
    let mut lines = vec![
        Paint::new(&user.username).bold().to_string(),
        user.email.to_string(),
    ];

    if let Some(created_at) = &user.created_at {
        lines.push(format!("Joined {}", format_member_since(created_at)));
    }

    return lines.join("\n");
}
