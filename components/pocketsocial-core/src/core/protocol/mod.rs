pub mod tx_parsing;
