mod lifecycle;
mod preparation;
mod schema;
