// Meowkov Engine — Markov-chain chat responder
// Learns word adjacency from chat lines into a corpus store and answers with
// bounded random walks over it, escalating to synthetic seeds when the input
// itself leads nowhere.

pub mod config;
pub mod corpus;
pub mod generator;
pub mod import;
pub mod irc;
pub mod mutator;
pub mod normalize;
pub mod responder;
pub mod seeds;
pub mod transliterate;
pub mod walker;
