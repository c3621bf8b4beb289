//! Data models
//!
//! Nutrition value types plus the Rust structs behind the database tables.

mod component;
mod dish;
mod ingredient;
mod nutrition;

pub use component::{
    calculate_component_nutrition, dish_allergens, get_dish_components, set_dish_components,
    Allergen, Component, ComponentCreate, DishComponentDetail, DishComponentInput,
};
pub use dish::{Dish, DishCreate, DishUpdate};
pub use ingredient::{Ingredient, SavedIngredient};
pub use nutrition::{NutritionProfile, NutritionTotals};
