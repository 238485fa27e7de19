pub mod beta;
pub mod breakout;
pub mod exit_planner;
pub mod position_sizer;
