// Numeric replies from RFC 1459 / RFC 2812, restricted to the set this
// server actually emits. The *_NB/*_STR pairs are consumed by the reply
// formatter in replies.rs.

// 001    RPL_WELCOME
//               "Welcome to the Internet Relay Network
//                <nick>!<user>@<host>"
pub const RPL_WELCOME_NB: u16 = 1;
pub const RPL_WELCOME_STR: &str = "Welcome to the IRC Network";

// 002    RPL_YOURHOST
//               "Your host is <servername>, running version <ver>"
pub const RPL_YOURHOST_NB: u16 = 2;

// 003    RPL_CREATED
//               "This server was created <date>"
pub const RPL_CREATED_NB: u16 = 3;

// 004    RPL_MYINFO
//               "<servername> <version> <available user modes>
//                <available channel modes>"
pub const RPL_MYINFO_NB: u16 = 4;

// User modes are stored but carry no semantics here; channel modes are the
// enforced alphabet plus the member-status flag 'o'.
pub const USER_MODES: &str = "iw";
pub const CHANNEL_MODES: &str = "itklmnpso";

// 324    RPL_CHANNELMODEIS
//               "<channel> <mode> <mode params>"
pub const RPL_CHANNELMODEIS_NB: u16 = 324;

// 331    RPL_NOTOPIC
//               "<channel> :No topic is set"
pub const RPL_NOTOPIC_NB: u16 = 331;
pub const RPL_NOTOPIC_STR: &str = "No topic is set";

// 332    RPL_TOPIC
//               "<channel> :<topic>"
pub const RPL_TOPIC_NB: u16 = 332;

// 353    RPL_NAMREPLY
//               "<channel> :[[@|+]<nick> [[@|+]<nick> [...]]]"
pub const RPL_NAMREPLY_NB: u16 = 353;

// 366    RPL_ENDOFNAMES
//               "<channel> :End of /NAMES list"
pub const RPL_ENDOFNAMES_NB: u16 = 366;
pub const RPL_ENDOFNAMES_STR: &str = "End of /NAMES list";

// 372    RPL_MOTD
//               ":- <text>"
pub const RPL_MOTD_NB: u16 = 372;

// 375    RPL_MOTDSTART
//               ":- <server> Message of the day - "
pub const RPL_MOTDSTART_NB: u16 = 375;

// 376    RPL_ENDOFMOTD
//               ":End of /MOTD command"
pub const RPL_ENDOFMOTD_NB: u16 = 376;
pub const RPL_ENDOFMOTD_STR: &str = "End of /MOTD command.";

// 401    ERR_NOSUCHNICK
//               "<nickname> :No such nick/channel"
pub const ERR_NOSUCHNICK_NB: u16 = 401;
pub const ERR_NOSUCHNICK_STR: &str = "No such nick/channel";

// 403    ERR_NOSUCHCHANNEL
//               "<channel name> :No such channel"
pub const ERR_NOSUCHCHANNEL_NB: u16 = 403;
pub const ERR_NOSUCHCHANNEL_STR: &str = "No such channel";

// 404    ERR_CANNOTSENDTOCHAN
//               "<channel name> :Cannot send to channel"
pub const ERR_CANNOTSENDTOCHAN_NB: u16 = 404;
pub const ERR_CANNOTSENDTOCHAN_STR: &str = "Cannot send to channel";

// 411    ERR_NORECIPIENT
//               ":No recipient given (<command>)"
pub const ERR_NORECIPIENT_NB: u16 = 411;

// 412    ERR_NOTEXTTOSEND
//               ":No text to send"
pub const ERR_NOTEXTTOSEND_NB: u16 = 412;
pub const ERR_NOTEXTTOSEND_STR: &str = "No text to send";

// 421    ERR_UNKNOWNCOMMAND
//               "<command> :Unknown command"
pub const ERR_UNKNOWNCOMMAND_NB: u16 = 421;
pub const ERR_UNKNOWNCOMMAND_STR: &str = "Unknown command";

// 431    ERR_NONICKNAMEGIVEN
//               ":No nickname given"
pub const ERR_NONICKNAMEGIVEN_NB: u16 = 431;
pub const ERR_NONICKNAMEGIVEN_STR: &str = "No nickname given";

// 432    ERR_ERRONEUSNICKNAME
//               "<nick> :Erroneous nickname"
pub const ERR_ERRONEUSNICKNAME_NB: u16 = 432;
pub const ERR_ERRONEUSNICKNAME_STR: &str = "Erroneous nickname";

// 433    ERR_NICKNAMEINUSE
//               "<nick> :Nickname is already in use"
pub const ERR_NICKNAMEINUSE_NB: u16 = 433;
pub const ERR_NICKNAMEINUSE_STR: &str = "Nickname is already in use";

// 442    ERR_NOTONCHANNEL
//               "<channel> :You're not on that channel"
pub const ERR_NOTONCHANNEL_NB: u16 = 442;
pub const ERR_NOTONCHANNEL_STR: &str = "You're not on that channel";

// 443    ERR_USERONCHANNEL
//               "<user> <channel> :is already on channel"
pub const ERR_USERONCHANNEL_NB: u16 = 443;
pub const ERR_USERONCHANNEL_STR: &str = "is already on channel";

// 461    ERR_NEEDMOREPARAMS
//               "<command> :Not enough parameters"
pub const ERR_NEEDMOREPARAMS_NB: u16 = 461;
pub const ERR_NEEDMOREPARAMS_STR: &str = "Not enough parameters";

// 462    ERR_ALREADYREGISTRED
//               ":You may not reregister"
pub const ERR_ALREADYREGISTRED_NB: u16 = 462;
pub const ERR_ALREADYREGISTRED_STR: &str = "You may not reregister";

// 464    ERR_PASSWDMISMATCH
//               ":Password incorrect"
pub const ERR_PASSWDMISMATCH_NB: u16 = 464;
pub const ERR_PASSWDMISMATCH_STR: &str = "Password incorrect";

// 471    ERR_CHANNELISFULL
//               "<channel> :Cannot join channel (+l)"
pub const ERR_CHANNELISFULL_NB: u16 = 471;
pub const ERR_CHANNELISFULL_STR: &str = "Cannot join channel (+l)";

// 473    ERR_INVITEONLYCHAN
//               "<channel> :Cannot join channel (+i)"
pub const ERR_INVITEONLYCHAN_NB: u16 = 473;
pub const ERR_INVITEONLYCHAN_STR: &str = "Cannot join channel (+i)";

// 475    ERR_BADCHANNELKEY
//               "<channel> :Cannot join channel (+k)"
pub const ERR_BADCHANNELKEY_NB: u16 = 475;
pub const ERR_BADCHANNELKEY_STR: &str = "Cannot join channel (+k)";

// 482    ERR_CHANOPRIVSNEEDED
//               "<channel> :You're not channel operator"
pub const ERR_CHANOPRIVSNEEDED_NB: u16 = 482;
pub const ERR_CHANOPRIVSNEEDED_STR: &str = "You're not channel operator";
