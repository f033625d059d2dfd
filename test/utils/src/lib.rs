use serde_json::json;
use serde_json::Value;

pub fn user_fixture(id: &str) -> Value {
    return json!({
        "_id": id,
        "username": format!("reader-{id}"),
        "email": format!("{id}@bookworm.test"),
        "profileImage": format!("https://api.dicebear.com/7.x/avataaars/svg?seed={id}"),
        "createdAt": "2024-03-02T10:15:00.000Z",
    });
}

pub fn book_fixture(id: &str, rating: u8) -> Value {
    return json!({
        "_id": id,
        "title": format!("Book {id}"),
        "caption": format!("Caption for {id}"),
        "rating": rating,
        "image": format!("https://res.cloudinary.com/bookworm/{id}.jpg"),
        "createdAt": "2024-05-17T08:30:00.000Z",
        "user": {
            "_id": "author-1",
            "username": "ada",
            "profileImage": "https://api.dicebear.com/7.x/avataaars/svg?seed=ada",
        },
    });
}

pub fn books_fixture(ids: &[&str]) -> Value {
    return Value::Array(
        ids.iter()
            .map(|id| {
                return book_fixture(id, 4);
            })
            .collect(),
    );
}

pub fn auth_body(id: &str, token: &str) -> String {
    return json!({
        "success": true,
        "message": "Welcome!",
        "token": token,
        "user": user_fixture(id),
    })
    .to_string();
}

pub fn feed_body(ids: &[&str], total_pages: u32) -> String {
    return json!({
        "success": true,
        "message": "Books fetched",
        "books": books_fixture(ids),
        "totalPages": total_pages,
    })
    .to_string();
}

pub fn failure_body(message: &str) -> String {
    return json!({
        "success": false,
        "message": message,
    })
    .to_string();
}
