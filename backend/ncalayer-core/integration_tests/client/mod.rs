mod connect;
mod exchange;
mod sign;
