//! Built-in mock scenarios for common use cases.
//!
//! This module provides pre-configured bots for demos and tests: a
//! greeter, an order desk that hands out numbers, and a weather service
//! that answers with structured payloads.

use serde_json::json;

use super::scenario::{Fallback, MockReply, Scenario};

/// A bot that greets and asks for a name.
#[must_use]
pub fn greeting_scenario() -> Scenario {
    Scenario::new("greeting")
        .on("hi", "Hello! What is your name?")
        .on("hello", "Hello! What is your name?")
        .on("bye", "Goodbye!")
        .fallback(Fallback::Reply("Sorry, I did not get that.".to_string()))
}

/// An order desk that confirms orders with a fixed order number.
#[must_use]
pub fn order_scenario(order_number: &str) -> Scenario {
    Scenario::new("orders")
        .on("I want a pizza", format!("Your order number is {order_number}"))
        .on(
            format!("status of {order_number}"),
            format!("Order {order_number} is on its way"),
        )
        .fallback(Fallback::Reply("Unknown order".to_string()))
}

/// A weather service answering with text and a structured payload.
#[must_use]
pub fn weather_scenario(city: &str, temperature: i64) -> Scenario {
    Scenario::new("weather").respond(
        format!("weather in {city}"),
        [MockReply::text(format!("It is {temperature} degrees in {city}")).with_json(json!({
            "intent": {"name": "weather", "confidence": 0.97},
            "location": city,
            "temperature": temperature,
        }))],
    )
}
