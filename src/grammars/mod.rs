pub mod pcfg;
