//! Built-in sample tables
//!
//! Four small tables (`users`, `orders`, `departments`, `sales`) and a set of
//! queries that exercise every stage against them. `orders` has a row for a
//! user that doesn't exist (user 99), and several users have no orders, so
//! every join type shows unmatched rows.

use crate::database::Database;
use crate::error::StepResult;
use crate::table::{Table, Value};

/// Queries that walk through each stage of the pipeline
pub const SAMPLE_QUERIES: &[&str] = &[
    "SELECT name, age, country FROM users WHERE age > 25",
    "SELECT country, COUNT(*) as user_count FROM users GROUP BY country \
     HAVING user_count > 1 ORDER BY user_count DESC",
    "SELECT category, SUM(amount) as total_sales FROM sales WHERE amount > 100 \
     GROUP BY category ORDER BY total_sales DESC",
    "SELECT name, country FROM users WHERE active = true ORDER BY name ASC",
    "SELECT users.name, orders.product, orders.amount FROM users \
     INNER JOIN orders ON users.id = orders.user_id",
    "SELECT users.name, orders.product FROM users LEFT JOIN orders ON users.id = orders.user_id",
    "SELECT users.name, orders.product FROM users RIGHT JOIN orders ON users.id = orders.user_id",
    "SELECT users.name, orders.product FROM users FULL JOIN orders ON users.id = orders.user_id",
    "SELECT users.name, COUNT(orders.order_id) as order_count FROM users \
     LEFT JOIN orders ON users.id = orders.user_id GROUP BY users.name \
     ORDER BY order_count DESC",
    "SELECT DISTINCT(country) FROM users WHERE active = true ORDER BY country",
    "SELECT region, quarter, SUM(amount) as quarterly_sales FROM sales \
     GROUP BY region, quarter ORDER BY region, quarter",
];

/// A catalog holding all four sample tables
pub fn sample_database() -> StepResult<Database> {
    let mut db = Database::new();
    for table in [users()?, orders()?, departments()?, sales()?] {
        db.add_table(table)?;
    }
    Ok(db)
}

fn int(n: i64) -> Value {
    Value::Integer(n)
}

fn text(s: &str) -> Value {
    Value::String(s.to_string())
}

fn build(name: &str, columns: &[&str], rows: Vec<Vec<Value>>) -> StepResult<Table> {
    let mut table = Table::new(name, columns.iter().map(|c| c.to_string()).collect());
    for row in rows {
        table.add_values(row)?;
    }
    Ok(table)
}

/// The `users` table
pub fn users() -> StepResult<Table> {
    let people = [
        (1, "Alice Johnson", 25, "USA", true),
        (2, "Bob Smith", 30, "UK", false),
        (3, "Charlie Brown", 22, "USA", true),
        (4, "David Wilson", 35, "Canada", true),
        (5, "Eve Davis", 28, "UK", true),
        (6, "Frank Miller", 32, "Germany", true),
        (7, "Grace Lee", 26, "Japan", true),
        (8, "Henry Taylor", 45, "USA", false),
        (9, "Ivy White", 24, "Australia", true),
        (10, "Jack Martinez", 38, "Spain", true),
        (11, "Karen Garcia", 29, "France", true),
        (12, "Leo Anderson", 31, "USA", true),
        (13, "Mia Thomas", 27, "Canada", false),
        (14, "Noah Jackson", 33, "UK", true),
        (15, "Olivia Martin", 23, "Germany", true),
    ];
    let rows = people
        .into_iter()
        .map(|(id, name, age, country, active)| {
            let first = name.split(' ').next().unwrap_or(name).to_lowercase();
            vec![
                int(id),
                text(name),
                int(age),
                text(country),
                Value::Boolean(active),
                text(&format!("{first}@example.com")),
            ]
        })
        .collect();
    build(
        "users",
        &["id", "name", "age", "country", "active", "email"],
        rows,
    )
}

/// The `orders` table
pub fn orders() -> StepResult<Table> {
    let placed = [
        (101, 1, "Laptop", 1200, "2024-01-15", "Delivered"),
        (102, 2, "Phone", 800, "2024-01-16", "Delivered"),
        (103, 1, "Monitor", 300, "2024-01-17", "Delivered"),
        (104, 3, "Keyboard", 150, "2024-01-18", "Pending"),
        (105, 4, "Desk", 450, "2024-01-19", "Delivered"),
        (106, 1, "Chair", 200, "2024-01-20", "Delivered"),
        (107, 6, "Headphones", 250, "2024-02-01", "Delivered"),
        (108, 7, "Tablet", 600, "2024-02-02", "Shipped"),
        (109, 9, "Webcam", 120, "2024-02-03", "Pending"),
        (110, 10, "Mouse Pad", 25, "2024-02-04", "Delivered"),
        (111, 3, "USB Hub", 45, "2024-02-05", "Delivered"),
        (112, 11, "Monitor Stand", 80, "2024-02-06", "Shipped"),
        (113, 12, "Laptop Stand", 100, "2024-02-07", "Delivered"),
        (114, 14, "Mechanical Keyboard", 180, "2024-02-08", "Pending"),
        (115, 7, "External SSD", 320, "2024-02-09", "Delivered"),
        (116, 4, "Docking Station", 200, "2024-02-10", "Shipped"),
        (117, 1, "Gaming Mouse", 75, "2024-02-11", "Delivered"),
        (118, 15, "Wireless Charger", 65, "2024-02-12", "Delivered"),
        (119, 6, "Monitor", 350, "2024-02-13", "Pending"),
        (120, 11, "Desk Lamp", 55, "2024-02-14", "Delivered"),
        (121, 99, "Premium Keyboard", 250, "2024-02-15", "Cancelled"),
    ];
    let rows = placed
        .into_iter()
        .map(|(order_id, user_id, product, amount, date, status)| {
            vec![
                int(order_id),
                int(user_id),
                text(product),
                int(amount),
                text(date),
                text(status),
            ]
        })
        .collect();
    build(
        "orders",
        &["order_id", "user_id", "product", "amount", "order_date", "status"],
        rows,
    )
}

/// The `departments` table
pub fn departments() -> StepResult<Table> {
    build(
        "departments",
        &["dept_id", "dept_name", "manager_id", "location", "budget"],
        vec![
            vec![int(1), text("Engineering"), int(1), text("New York"), int(500000)],
            vec![int(2), text("Sales"), int(3), text("London"), int(300000)],
            vec![int(3), text("Marketing"), int(6), text("Berlin"), int(200000)],
            vec![int(4), text("HR"), int(7), text("Tokyo"), int(150000)],
            vec![int(5), text("Finance"), int(10), text("Madrid"), int(350000)],
            vec![int(6), text("Operations"), int(12), text("USA"), int(400000)],
            vec![int(7), text("R&D"), int(99), text("Silicon Valley"), int(750000)],
        ],
    )
}

/// The `sales` table
pub fn sales() -> StepResult<Table> {
    let sold = [
        (101, "Laptop", 1200, "Electronics", "North", "Q1"),
        (102, "Phone", 800, "Electronics", "South", "Q1"),
        (103, "Chair", 150, "Furniture", "North", "Q1"),
        (104, "Desk", 450, "Furniture", "West", "Q1"),
        (105, "Headphones", 200, "Electronics", "East", "Q2"),
        (106, "Monitor", 300, "Electronics", "North", "Q2"),
        (107, "Lamp", 45, "Furniture", "South", "Q2"),
        (108, "Tablet", 600, "Electronics", "West", "Q2"),
        (109, "Keyboard", 150, "Electronics", "East", "Q3"),
        (110, "Bookshelf", 200, "Furniture", "North", "Q3"),
        (111, "Mouse", 50, "Electronics", "South", "Q3"),
        (112, "Desk Organizer", 75, "Furniture", "West", "Q3"),
        (113, "USB Hub", 45, "Electronics", "East", "Q4"),
        (114, "Printer", 300, "Electronics", "North", "Q4"),
        (115, "Office Chair", 250, "Furniture", "South", "Q4"),
    ];
    let rows = sold
        .into_iter()
        .map(|(id, product, amount, category, region, quarter)| {
            vec![
                int(id),
                text(product),
                int(amount),
                text(category),
                text(region),
                text(quarter),
            ]
        })
        .collect();
    build(
        "sales",
        &["id", "product", "amount", "category", "region", "quarter"],
        rows,
    )
}
